//! Operation counters behind the `stats` cargo feature.
//!
//! The counters are diagnostics only and use plain `std` atomics so they
//! stay outside the loom model.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Snapshot of a deque's operation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Elements pushed by the owner.
    pub pushed: u64,
    /// Elements returned by `pop`.
    pub popped: u64,
    /// Elements returned by `steal`.
    pub stolen: u64,
    /// Buffer replacements, grows and shrinks combined.
    pub resizes: u64,
    /// Superseded buffers freed by the reclamation protocol.
    pub reclaimed_buffers: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    pushed: AtomicU64,
    popped: AtomicU64,
    stolen: AtomicU64,
    resizes: AtomicU64,
    reclaimed_buffers: AtomicU64,
}

impl Counters {
    pub(crate) fn new() -> Counters {
        Counters::default()
    }

    pub(crate) fn increment_pushed(&self) {
        self.pushed.fetch_add(1, Relaxed);
    }

    pub(crate) fn increment_popped(&self) {
        self.popped.fetch_add(1, Relaxed);
    }

    pub(crate) fn increment_stolen(&self) {
        self.stolen.fetch_add(1, Relaxed);
    }

    pub(crate) fn increment_resizes(&self) {
        self.resizes.fetch_add(1, Relaxed);
    }

    pub(crate) fn increment_reclaimed(&self, n: u64) {
        self.reclaimed_buffers.fetch_add(n, Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            pushed: self.pushed.load(Relaxed),
            popped: self.popped.load(Relaxed),
            stolen: self.stolen.load(Relaxed),
            resizes: self.resizes.load(Relaxed),
            reclaimed_buffers: self.reclaimed_buffers.load(Relaxed),
        }
    }
}
