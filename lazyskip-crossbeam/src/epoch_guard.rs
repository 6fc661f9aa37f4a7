//! Epoch-based guard using crossbeam-epoch.
//!
//! `EpochGuard` hands unlinked skip nodes to the global epoch collector. A
//! node is freed once every thread that was pinned when it was retired has
//! unpinned, so readers that are mid-traversal never touch freed memory.
//!
//! ```text
//! LazySkipList<i32, EpochGuard>
//!     │
//!     ├── contains / find / iter   pin the thread while walking
//!     └── erase / remove / clear   retire nodes through defer_unchecked
//! ```
//!
//! # Example
//!
//! ```rust
//! use lazyskip_core::LazySkipList;
//! use lazyskip_crossbeam::EpochGuard;
//!
//! let set: LazySkipList<i32, EpochGuard> = LazySkipList::new();
//! set.insert(42);
//! set.insert(17);
//!
//! if let Some(val) = set.find(&42) {
//!     assert_eq!(*val, 42);
//! }
//!
//! assert!(set.erase(&42));
//! ```

use std::fmt;
use std::ops::Deref;

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use lazyskip_core::Guard;

/// Epoch-based memory reclamation guard.
///
/// Zero-sized: all state lives in the global collector, so the set that
/// stores it stays `Send + Sync` and pays nothing per instance.
///
/// - **Pin**: thread-local, nested pins are cheap
/// - **Reclamation**: batched, amortized O(1) per retired node
/// - **Memory**: retired nodes accumulate while any thread stays pinned
///
/// # Retired values
///
/// Values are dropped by the collector at some later point, possibly on
/// another thread, so erasing requires `T: 'static`. A set of borrowed
/// values can be filled and read but not erased:
///
/// ```compile_fail
/// use lazyskip_core::{LazySkipList, SkipListConfig};
/// use lazyskip_crossbeam::EpochGuard;
///
/// let local = String::from("short-lived");
/// let config = SkipListConfig::default().key_mapper(|s: &&String| s.len() as u64);
/// let set: LazySkipList<&String, EpochGuard, _> = LazySkipList::with_config(config).unwrap();
/// set.insert(&local);
/// set.erase(&&local);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct EpochGuard;

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard
    }

    /// Push this thread's retired nodes to the global queue and try to
    /// advance the epoch.
    ///
    /// Reclamation still needs every other pinned thread to unpin.
    pub fn flush() {
        epoch::pin().flush();
    }
}

/// A value reference that keeps the current thread pinned.
///
/// The referenced node cannot be freed until the `EpochRef` drops, even if
/// another thread erases it in the meantime.
pub struct EpochRef<'a, T> {
    _guard: CrossbeamGuard,
    reference: &'a T,
}

impl<'a, T> EpochRef<'a, T> {
    /// # Safety
    ///
    /// `reference` must point into a node that `guard` protects.
    unsafe fn new(guard: CrossbeamGuard, reference: &'a T) -> Self {
        EpochRef {
            _guard: guard,
            reference,
        }
    }

    pub fn get(&self) -> &T {
        self.reference
    }
}

impl<T> Deref for EpochRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.reference
    }
}

impl<T: fmt::Display> fmt::Display for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reference.fmt(f)
    }
}

impl<T: fmt::Debug> fmt::Debug for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EpochRef").field(self.reference).finish()
    }
}

impl Guard for EpochGuard {
    type GuardedRef<'a, T: 'a> = EpochRef<'a, T>;

    // A real crossbeam guard: the thread stays pinned while a set operation
    // or iterator holds it.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N: 'static>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        let guard = epoch::pin();
        // Safety: the caller guarantees the node is unlinked and retired once,
        // so only threads pinned before this call can still hold it.
        unsafe {
            guard.defer_unchecked(move || dealloc(node));
        }
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        // A fresh pin outlives the caller's read guard.
        let guard = epoch::pin();
        unsafe { EpochRef::new(guard, &*ptr) }
    }
}
