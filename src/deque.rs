//! The deque core: the `top`/`bottom` index pair, the current buffer, the
//! resize policy and the reclamation protocol.

use core::ptr;

use cache_padded::CachePadded;

use crate::buffer::Buffer;
use crate::loom::cell::UnsafeCell;
use crate::loom::sync::atomic::{
    fence, AtomicI64, AtomicPtr,
    Ordering::{Acquire, Relaxed, Release, SeqCst},
};
use crate::registry::Registry;
#[cfg(feature = "stats")]
use crate::stats::Counters;

/// The initial buffer holds `2^LOG_INITIAL_SIZE` elements; a deque never
/// shrinks below that capacity.
pub(crate) const LOG_INITIAL_SIZE: u32 = 4;

pub(crate) struct Deque<T> {
    /// Steal end. Advanced by CAS only: by stealers, and once per size-1 pop
    /// by the owner racing for the last element.
    top: CachePadded<AtomicI64>,
    /// Owner end. Written by the owner only.
    bottom: CachePadded<AtomicI64>,
    /// The current buffer. Replaced by the owner on resize, loaded by
    /// everyone.
    buffer: AtomicPtr<Buffer<T>>,
    /// Head of the chain of superseded, not yet reclaimed buffers, or null.
    /// Owner-private.
    unlinked: UnsafeCell<*mut Buffer<T>>,
    pub(crate) registry: Registry,
    #[cfg(feature = "stats")]
    pub(crate) counters: Counters,
}

// SAFETY: the raw buffer pointers are managed by the owner under the
// reclamation protocol, and an element moves between threads at most once.
unsafe impl<T: Send> Send for Deque<T> {}
unsafe impl<T: Send> Sync for Deque<T> {}

impl<T> Deque<T> {
    pub(crate) fn new() -> Deque<T> {
        Deque {
            top: CachePadded::new(AtomicI64::new(0)),
            bottom: CachePadded::new(AtomicI64::new(0)),
            buffer: AtomicPtr::new(Box::into_raw(Buffer::new(LOG_INITIAL_SIZE, 0))),
            unlinked: UnsafeCell::new(ptr::null_mut()),
            registry: Registry::new(),
            #[cfg(feature = "stats")]
            counters: Counters::new(),
        }
    }

    /// Number of elements currently in the deque.
    pub(crate) fn len(&self) -> usize {
        let b = self.bottom.load(Relaxed);
        let t = self.top.load(Relaxed);
        (b - t).max(0) as usize
    }

    /// Id of the current buffer.
    ///
    /// # Safety
    ///
    /// The caller must be inside a window in which the loaded buffer cannot
    /// be reclaimed: the owner thread, or a stealer whose `idle` flag is
    /// clear.
    pub(crate) unsafe fn current_buffer_id(&self) -> i64 {
        // Ordering: Acquire stands in for the consume load in the paper.
        let a = self.buffer.load(Acquire);
        unsafe { (*a).id() }
    }

    /// Appends `value` at the bottom.
    ///
    /// # Safety
    ///
    /// Owner thread only.
    pub(crate) unsafe fn push_bottom(&self, value: T) {
        let b = self.bottom.load(Relaxed);
        let t = self.top.load(Acquire);
        let mut a = self.buffer.load(Relaxed);

        // SAFETY: `a` is the live buffer; only the owner replaces it.
        let capacity = unsafe { (*a).capacity() };
        if b - t >= capacity - 1 {
            /* slow path: grow and republish the buffer */
            a = unsafe { self.replace_buffer(a, b, t, 1) };
        }

        // SAFETY: owner thread.
        let unlinked = unsafe { self.unlinked_head() };
        if !unlinked.is_null() {
            unsafe { self.reclaim_buffers(a) };
        }

        // SAFETY: slot `b` lies outside `[top, bottom)`, so no stealer can
        // read it until `bottom` advances below.
        unsafe { (*a).put(b, value) };

        // Ordering: the element write must be visible before the new
        // `bottom`, or a stealer could claim an uninitialized slot.
        fence(Release);
        self.bottom.store(b + 1, Relaxed);

        #[cfg(feature = "stats")]
        self.counters.increment_pushed();
    }

    /// Removes the element at the bottom.
    ///
    /// # Safety
    ///
    /// Owner thread only.
    pub(crate) unsafe fn pop_bottom(&self) -> Option<T> {
        let b = self.bottom.load(Relaxed);
        let mut a = self.buffer.load(Acquire);

        self.bottom.store(b - 1, Relaxed);
        // Ordering: the speculative decrement must be ordered against a
        // stealer's `top` increment; both sides run a SeqCst fence between
        // their write and the read of the opposite index.
        fence(SeqCst);
        let t = self.top.load(Relaxed);

        let size = b - t;
        if size <= 0 {
            // Empty. Undo the decrement.
            self.bottom.store(b, Relaxed);
            return None;
        }

        if size == 1 {
            // Last element: race any stealer for index `t`.
            let popped = if self.top.compare_exchange(t, t + 1, SeqCst, Relaxed).is_ok() {
                // SAFETY: the CAS claimed index `t` exclusively.
                Some(unsafe { (*a).get(t) })
            } else {
                None
            };
            self.bottom.store(b, Relaxed);
            #[cfg(feature = "stats")]
            if popped.is_some() {
                self.counters.increment_popped();
            }
            return popped;
        }

        // SAFETY: `bottom` already moved below `b - 1`, so that index
        // belongs to the owner alone.
        let popped = unsafe { (*a).get(b - 1) };

        // SAFETY: only the owner replaces the buffer.
        let capacity = unsafe { (*a).capacity() };
        if size <= capacity / 3 && size > (1i64 << LOG_INITIAL_SIZE) {
            /* shrink back towards the initial capacity */
            a = unsafe { self.replace_buffer(a, b, t, -1) };
        }
        // SAFETY: owner thread.
        let unlinked = unsafe { self.unlinked_head() };
        if !unlinked.is_null() {
            unsafe { self.reclaim_buffers(a) };
        }

        #[cfg(feature = "stats")]
        self.counters.increment_popped();
        Some(popped)
    }

    /// Removes the element at the top. Called by stealers; safe to run
    /// concurrently with every other operation.
    pub(crate) fn steal(&self) -> Option<T> {
        let t = self.top.load(Acquire);
        // Ordering: `top` must be read before `bottom`, or the size computed
        // below could miss a concurrent pop of the last element.
        fence(SeqCst);
        let b = self.bottom.load(Acquire);

        if b - t <= 0 {
            return None;
        }

        // Ordering: Acquire stands in for the consume load in the paper; the
        // owner published the buffer, and the elements copied into it, with
        // Release.
        let a = self.buffer.load(Acquire);
        if self.top.compare_exchange(t, t + 1, SeqCst, Relaxed).is_ok() {
            #[cfg(feature = "stats")]
            self.counters.increment_stolen();
            // SAFETY: the CAS claimed index `t` exclusively, and the slot
            // was initialized before `bottom` advanced past it.
            Some(unsafe { (*a).get(t) })
        } else {
            None
        }
    }

    /// Head of the unlinked chain.
    ///
    /// # Safety
    ///
    /// Owner thread only; `unlinked` is owner-private.
    unsafe fn unlinked_head(&self) -> *mut Buffer<T> {
        self.unlinked.with(|u| unsafe { *u })
    }

    /// Swaps in a resized buffer and returns it. The replaced buffer becomes
    /// the head of the unlinked chain if the chain was empty; otherwise it
    /// is already reachable from the head through `next` links.
    ///
    /// # Safety
    ///
    /// Owner thread only, and `bottom - top` must fit the resized capacity.
    unsafe fn replace_buffer(
        &self,
        old: *mut Buffer<T>,
        b: i64,
        t: i64,
        delta: i32,
    ) -> *mut Buffer<T> {
        // SAFETY: per contract; `[t, b)` is the live range.
        let new = unsafe { (*old).resize(b, t, delta) };
        self.unlinked.with_mut(|u| {
            // SAFETY: owner-private.
            unsafe {
                if (*u).is_null() {
                    *u = old;
                }
            }
        });
        // Ordering: Release publishes the copied elements together with the
        // new buffer pointer.
        self.buffer.store(new, Release);
        #[cfg(feature = "stats")]
        self.counters.increment_resizes();
        new
    }

    /// Frees every buffer in the unlinked chain that no stealer can still be
    /// reading, oldest first.
    ///
    /// `current` is the buffer most recently stored to `self.buffer`. A
    /// non-idle stealer advertises, through its record, the oldest buffer id
    /// it may still dereference; everything strictly older than the minimum
    /// over those is unreachable and can be freed.
    ///
    /// # Safety
    ///
    /// Owner thread only, and the unlinked chain must be non-empty.
    unsafe fn reclaim_buffers(&self, current: *mut Buffer<T>) {
        // Ordering: pairs with the SeqCst fence a stealer runs between
        // clearing `idle` and loading `buffer`. Whichever fence comes later
        // settles the race: either this scan observes the stealer busy, or
        // the stealer observes `current` (or newer) and never dereferences a
        // buffer this pass frees.
        fence(SeqCst);

        // SAFETY: `current` is the live buffer.
        let mut min_id = unsafe { (*current).id() };
        for record in self.registry.iter() {
            // Ordering: Acquire pairs with the Release stores of `idle`, so
            // a record seen busy carries the `last_buffer_id` it published
            // no later than its previous idle transition.
            if !record.idle.load(Acquire) {
                min_id = min_id.min(record.last_buffer_id.load(Relaxed));
            }
        }

        self.unlinked.with_mut(|u| {
            // SAFETY: owner-private; ids below `min_id` are unreachable by
            // every stealer, and the owner holds no reference into the
            // chain.
            unsafe {
                while !(*u).is_null() && (**u).id() < min_id {
                    let reclaimed = Box::from_raw(*u);
                    *u = reclaimed.next();
                    #[cfg(feature = "stats")]
                    self.counters.increment_reclaimed(1);
                }
                // The chain holds superseded buffers only: once the walk
                // reaches the live buffer, everything older has been freed
                // and the chain is empty.
                if *u == current {
                    *u = ptr::null_mut();
                }
            }
        });
    }
}

impl<T> Drop for Deque<T> {
    fn drop(&mut self) {
        let b = self.bottom.load(Relaxed);
        let t = self.top.load(Relaxed);
        let current = self.buffer.load(Relaxed);

        // Dropping the deque means every handle is gone, so this thread has
        // exclusive access to the buffers and the remaining elements.
        for i in t..b {
            // SAFETY: `[top, bottom)` is the live range of the current
            // buffer, and nobody claims indices anymore.
            drop(unsafe { (*current).get(i) });
        }

        self.unlinked.with_mut(|u| {
            let mut head = unsafe { *u };
            while !head.is_null() && head != current {
                // SAFETY: chain buffers were allocated by `Buffer::new` and
                // are no longer reachable by anyone else.
                let reclaimed = unsafe { Box::from_raw(head) };
                head = reclaimed.next();
            }
        });
        // SAFETY: as above; the live buffer is freed last.
        drop(unsafe { Box::from_raw(current) });
    }
}
