//! The circular buffer backing the deque, and the chain linking superseded
//! buffers to their replacement.

use core::mem::MaybeUninit;
use core::ptr;

use crate::loom::cell::UnsafeCell;
use crate::loom::sync::atomic::{AtomicPtr, Ordering::Relaxed};

/// A fixed-capacity, power-of-two ring of element slots.
///
/// Indices grow monotonically and are mapped onto a slot by masking with
/// `capacity - 1`. A buffer never moves once allocated: resizing allocates a
/// successor carrying the next generation id and links it through `next`, so
/// the owner can later walk from the oldest superseded buffer up to the live
/// one when reclaiming.
pub(crate) struct Buffer<T> {
    /// Generation number. The initial buffer has id 0; each resize adds one.
    id: i64,
    log_size: u32,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// The buffer that replaced this one, if any. Stored once, by the owner,
    /// inside `resize`.
    next: AtomicPtr<Buffer<T>>,
}

impl<T> Buffer<T> {
    pub(crate) fn new(log_size: u32, id: i64) -> Box<Buffer<T>> {
        let slots = (0..1usize << log_size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Box::new(Buffer {
            id,
            log_size,
            slots,
            next: AtomicPtr::new(ptr::null_mut()),
        })
    }

    pub(crate) fn id(&self) -> i64 {
        self.id
    }

    pub(crate) fn capacity(&self) -> i64 {
        1i64 << self.log_size
    }

    /// The buffer that replaced this one, or null.
    pub(crate) fn next(&self) -> *mut Buffer<T> {
        self.next.load(Relaxed)
    }

    #[inline(always)]
    fn slot(&self, index: i64) -> &UnsafeCell<MaybeUninit<T>> {
        &self.slots[(index & (self.capacity() - 1)) as usize]
    }

    /// Moves the element at `index` out of its slot.
    ///
    /// # Safety
    ///
    /// The slot must hold an element published by a matching [`put`], and the
    /// caller must have claimed `index` (through the `top` CAS or the owner's
    /// exclusive range) so that no other thread moves it out as well.
    ///
    /// [`put`]: Buffer::put
    pub(crate) unsafe fn get(&self, index: i64) -> T {
        self.slot(index)
            .with(|slot| unsafe { slot.read().assume_init() })
    }

    /// Writes `value` at `index`. A previous element in the slot is
    /// overwritten without being dropped.
    ///
    /// # Safety
    ///
    /// No other thread may access the slot concurrently. The owner guarantees
    /// this by writing only at `bottom`, which lies outside `[top, bottom)`.
    pub(crate) unsafe fn put(&self, index: i64, value: T) {
        self.slot(index)
            .with_mut(|slot| unsafe { slot.write(MaybeUninit::new(value)) });
    }

    /// Allocates the successor buffer with capacity `2^(log_size + delta)`,
    /// copies the live range `[top, bottom)` over, links it through `next`
    /// and returns it.
    ///
    /// # Safety
    ///
    /// Owner only. `bottom - top` must not exceed the new capacity, and every
    /// index in `[top, bottom)` must hold a live element.
    pub(crate) unsafe fn resize(&self, bottom: i64, top: i64, delta: i32) -> *mut Buffer<T> {
        let log_size = (self.log_size as i32 + delta) as u32;
        debug_assert!(bottom - top <= (1i64 << log_size));
        let new = Buffer::new(log_size, self.id + 1);
        for i in top..bottom {
            // A bit-copy: the slot in `self` stays behind for stealers that
            // still hold the old buffer pointer, but any index is claimed at
            // most once globally, so only one copy is ever moved out.
            unsafe { new.put(i, self.get(i)) };
        }
        let new = Box::into_raw(new);
        self.next.store(new, Relaxed);
        new
    }
}
