//! Registry of stealer records used to bound buffer reclamation.
//!
//! Every stealer handle owns one record. The record is pushed at the list
//! head when the handle is created and stays in the list until the deque is
//! dropped, so the owner can walk the list with nothing more than an acquire
//! load of the head. A dropped handle leaves its record behind with `idle`
//! permanently set; that costs one node per stealer ever created and keeps
//! node removal entirely out of the reclamation protocol.

use core::marker::PhantomData;
use core::ptr;

use crate::loom::sync::atomic::{
    AtomicBool, AtomicI64, AtomicPtr,
    Ordering::{Acquire, Relaxed, Release},
};

/// Reclamation record of one stealer.
pub(crate) struct StealerRecord {
    /// Id of the buffer this stealer most recently observed. Consulted by
    /// the owner only while `idle` is false.
    pub(crate) last_buffer_id: AtomicI64,
    /// Cleared for the duration of a steal attempt. While set, the stealer
    /// holds no reference into any buffer.
    pub(crate) idle: AtomicBool,
    /// Next record in the list. Written once, before the record is
    /// published.
    next: *mut StealerRecord,
}

pub(crate) struct Registry {
    head: AtomicPtr<StealerRecord>,
}

impl Registry {
    pub(crate) fn new() -> Registry {
        Registry {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Registers a new stealer and returns its record.
    ///
    /// The record keeps a stable address for the lifetime of the registry.
    pub(crate) fn register(&self) -> *mut StealerRecord {
        let record = Box::into_raw(Box::new(StealerRecord {
            last_buffer_id: AtomicI64::new(0),
            idle: AtomicBool::new(true),
            next: ptr::null_mut(),
        }));

        let mut head = self.head.load(Relaxed);
        loop {
            // SAFETY: `record` is not yet visible to any other thread.
            unsafe { (*record).next = head };
            // Ordering: Release publishes the record's fields together with
            // the new head.
            match self
                .head
                .compare_exchange_weak(head, record, Release, Relaxed)
            {
                Ok(_) => return record,
                Err(current) => head = current,
            }
        }
    }

    /// Iterates over every registered record.
    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            // Ordering: Acquire pairs with the Release publish in
            // `register`.
            cursor: self.head.load(Acquire),
            _marker: PhantomData,
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let mut head = self.head.load(Relaxed);
        while !head.is_null() {
            // SAFETY: the deque is going away, so no stealer handle (and
            // therefore no record borrow) is left.
            let record = unsafe { Box::from_raw(head) };
            head = record.next;
        }
    }
}

pub(crate) struct Iter<'a> {
    cursor: *mut StealerRecord,
    _marker: PhantomData<&'a Registry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a StealerRecord;

    fn next(&mut self) -> Option<&'a StealerRecord> {
        if self.cursor.is_null() {
            return None;
        }
        // SAFETY: records live exactly as long as the registry.
        let record = unsafe { &*self.cursor };
        self.cursor = record.next;
        Some(record)
    }
}
