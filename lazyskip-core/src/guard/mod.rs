//! Guard trait for memory reclamation strategies.
//!
//! The skip list never frees a node it has unlinked. It hands the node to its
//! guard, and the guard decides when no traversal can still reach it.
//!
//! ```text
//! LazySkipList<T, G: Guard>
//!     │
//!     ├── LazySkipList<T, EpochGuard>      (production, lazyskip-crossbeam)
//!     └── LazySkipList<T, DeferredGuard>   (testing)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lazyskip_core::LazySkipList;
//! use lazyskip_crossbeam::EpochGuard;
//!
//! let set: LazySkipList<i32, EpochGuard> = LazySkipList::new();
//! set.insert(42);
//! ```

mod deferred_guard;

use std::ops::Deref;

pub use deferred_guard::{DeferredGuard, DeferredRef};

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// - **EpochGuard**: low overhead, batched reclamation (crossbeam-epoch)
/// - **DeferredGuard**: defers all destruction until the set drops (testing)
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. A node passed to `defer_destroy` is not freed while any `ReadGuard`
///    obtained before the call is still alive
/// 2. `GuardedRef` keeps the referenced data valid for its lifetime
///
/// Guards are stored in the set and must be `Send + Sync`. The stored guard
/// schedules destruction; per-operation protection comes from [`Guard::pin`].
pub trait Guard: Sized + Default + Send + Sync {
    /// A reference protected by a guard of this type.
    type GuardedRef<'a, T: 'a>: Deref<Target = T>;

    /// An active guard that protects reads for its lifetime.
    ///
    /// Epoch guards hold a pinned `crossbeam_epoch::Guard`; the deferred guard
    /// uses `()` because its nodes outlive every reader anyway.
    type ReadGuard: Sized;

    /// Pin an active read guard.
    ///
    /// Every node pointer loaded from a tower cell while the returned guard is
    /// alive stays dereferenceable until the guard drops.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must have been allocated by the set and not freed
    /// - `node` must be unlinked at every level (unreachable for new traversals)
    /// - `node` must be retired at most once
    /// - `dealloc` must be the matching deallocation function
    ///
    /// `dealloc` may run on another thread after the caller's borrows have
    /// ended, hence `N: 'static`.
    unsafe fn defer_destroy<N: 'static>(&self, node: *mut N, dealloc: unsafe fn(*mut N));

    /// Create a guarded reference from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to data currently protected by a pinned guard
    /// - The data must remain valid for lifetime `'a`
    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T>;
}
