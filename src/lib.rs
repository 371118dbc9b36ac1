//! A lock-free, dynamically sized work-stealing deque.
//!
//! This is the Chase–Lev double-ended queue in the formulation of
//! ["Correct and Efficient Work-Stealing for Weak Memory Models"][weak],
//! with one addition over the textbook algorithm: buffers replaced by a
//! resize are handed to a reclamation protocol that frees them once no
//! stealer can still be reading them, so a long-lived deque neither leaks
//! its history of buffers nor needs an epoch collector to dispose of them.
//!
//! # Deque semantics
//!
//! - A single [`Owner`] pushes and pops at the bottom without heavy
//!   synchronization on the fast path; pops are LIFO.
//! - Any number of [`Stealer`]s remove elements from the top, in FIFO
//!   order, racing each other and the owner's pop of the last element
//!   through a CAS on `top`.
//! - The backing buffer grows when full and shrinks back towards its
//!   initial capacity when mostly empty; callers never observe capacity.
//! - Every stealer handle carries a registry record. After a resize the
//!   owner walks the registry and frees each superseded buffer strictly
//!   older than anything a non-idle stealer could still reach.
//!
//! `pop` and `steal` return `None` both on an empty deque and on a lost
//! race; the two cases are deliberately indistinguishable, and callers
//! retry at their own discretion.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//!
//! let (mut owner, stealer) = wsdeque::new();
//!
//! for i in 0..4 {
//!     owner.push(i);
//! }
//!
//! // Steal from another thread while the owner pops.
//! let th = thread::spawn(move || {
//!     let mut stolen = 0;
//!     while stealer.steal().is_some() {
//!         stolen += 1;
//!     }
//!     stolen
//! });
//!
//! let mut popped = 0;
//! while owner.pop().is_some() {
//!     popped += 1;
//! }
//!
//! // Every element came out exactly once.
//! assert_eq!(popped + th.join().unwrap(), 4);
//! ```
//!
//! [weak]: https://dl.acm.org/doi/10.1145/2442516.2442524

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(unreachable_pub)]

use core::fmt;
use core::marker::PhantomData;

mod buffer;
mod deque;
mod loom;
mod registry;
#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub use stats::Stats;

use crate::deque::Deque;
use crate::loom::sync::atomic::Ordering::{Relaxed, Release};
use crate::loom::sync::Arc;
use crate::registry::StealerRecord;

/// Creates a deque and returns its two endpoints.
///
/// The [`Owner`] endpoint is unique; the [`Stealer`] endpoint can be cloned
/// once per stealing thread. The deque stays alive until the last endpoint
/// is dropped, at which point any elements still enqueued are dropped with
/// it.
pub fn new<T>() -> (Owner<T>, Stealer<T>) {
    let deque = Arc::new(Deque::new());
    let record = deque.registry.register();
    (
        Owner {
            deque: deque.clone(),
            _not_sync: PhantomData,
        },
        Stealer { deque, record },
    )
}

/// The owner endpoint of a deque.
///
/// There is exactly one owner per deque: the type is not `Clone`, and both
/// [`push`](Owner::push) and [`pop`](Owner::pop) take `&mut self`. Moving
/// the owner to another thread is fine; sharing it between threads is not,
/// and the type is deliberately `!Sync`.
pub struct Owner<T> {
    deque: Arc<Deque<T>>,
    /// Keeps the type `!Sync` while staying `Send`.
    _not_sync: PhantomData<core::cell::Cell<u8>>,
}

impl<T> Owner<T> {
    /// Appends `value` at the bottom of the deque, growing the backing
    /// buffer if it is full.
    #[inline(always)]
    pub fn push(&mut self, value: T) {
        // SAFETY: `Owner` is unique, `!Sync` and borrowed mutably, so this
        // call runs on the one owner thread.
        unsafe { self.deque.push_bottom(value) }
    }

    /// Removes the most recently pushed element still in the deque.
    ///
    /// Returns `None` if the deque is empty or if a stealer won the race
    /// for the last element.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: as in `push`.
        unsafe { self.deque.pop_bottom() }
    }

    /// Number of elements currently in the deque.
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    /// True if the deque holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the deque's operation counters.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> Stats {
        self.deque.counters.snapshot()
    }
}

impl<T> fmt::Debug for Owner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner").field("len", &self.len()).finish()
    }
}

/// A stealer endpoint of a deque.
///
/// Every clone is an independent endpoint with its own registry record,
/// meant to be moved to its stealing thread. The type is `Send` but
/// deliberately `!Sync`: the reclamation record written by
/// [`steal`](Stealer::steal) assumes a single writer, so one handle must
/// not be shared between threads.
pub struct Stealer<T> {
    deque: Arc<Deque<T>>,
    record: *mut StealerRecord,
}

// SAFETY: the record pointer stays valid for the lifetime of the deque,
// and moving the handle moves the single-writer role along with it.
unsafe impl<T: Send> Send for Stealer<T> {}

impl<T> Stealer<T> {
    /// Removes the oldest element in the deque.
    ///
    /// Returns `None` if the deque is empty or if a concurrent `pop` or
    /// `steal` won the race; the two cases are indistinguishable.
    pub fn steal(&self) -> Option<T> {
        // SAFETY: the record lives as long as the deque, and `self.deque`
        // keeps the deque alive.
        let record = unsafe { &*self.record };

        // Ordering: Release pairs with the reclaimer's Acquire scan. From
        // here to the matching store below, the owner must either see this
        // record busy or prove the buffers it frees are ones we cannot
        // reach.
        record.idle.store(false, Release);

        let stolen = self.deque.steal();

        // Advertise the newest buffer this handle can have observed; once
        // we go busy again, the owner treats everything older as
        // reclaimable. Done while still non-idle, so the buffer dereference
        // cannot race the reclaimer.
        // SAFETY: `idle` is false.
        let id = unsafe { self.deque.current_buffer_id() };
        record.last_buffer_id.store(id, Relaxed);

        record.idle.store(true, Release);

        stolen
    }

    /// True if the deque appeared empty. The answer may already be outdated
    /// by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.deque.len() == 0
    }
}

impl<T> Clone for Stealer<T> {
    /// Returns a new independent stealer endpoint, registering a fresh
    /// reclamation record for it.
    fn clone(&self) -> Stealer<T> {
        Stealer {
            deque: self.deque.clone(),
            record: self.deque.registry.register(),
        }
    }
}

impl<T> fmt::Debug for Stealer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Stealer { .. }")
    }
}
