//! Switch between `std` and `loom` synchronization primitives.
//!
//! Compiling with `RUSTFLAGS="--cfg loom"` routes every atomic, `UnsafeCell`
//! and `Arc` through the loom model checker; a regular build uses the real
//! `std` types with zero overhead.

#[cfg(loom)]
pub(crate) mod cell {
    pub(crate) use ::loom::cell::UnsafeCell;
}

#[cfg(loom)]
pub(crate) mod sync {
    pub(crate) use ::loom::sync::Arc;

    pub(crate) mod atomic {
        pub(crate) use ::loom::sync::atomic::{fence, AtomicBool, AtomicI64, AtomicPtr, Ordering};
    }
}

#[cfg(not(loom))]
pub(crate) mod cell {
    /// `std` stand-in for `loom::cell::UnsafeCell` with the same
    /// closure-based access API.
    #[derive(Debug)]
    pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        pub(crate) fn new(data: T) -> UnsafeCell<T> {
            UnsafeCell(core::cell::UnsafeCell::new(data))
        }

        #[inline(always)]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}

#[cfg(not(loom))]
pub(crate) mod sync {
    pub(crate) use std::sync::Arc;

    pub(crate) mod atomic {
        pub(crate) use std::sync::atomic::{fence, AtomicBool, AtomicI64, AtomicPtr, Ordering};
    }
}
