use std::alloc::{Layout, handle_alloc_error};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::Backoff;
use parking_lot::MutexGuard;

use crate::config::SkipListConfig;
use crate::data_structures::internal::marked_ptr::MarkedPtr;
use crate::data_structures::sorted::iter::Iter;
use crate::data_structures::sorted::key_mapper::{KeyMapper, OrderedKey, OrderedKeyMapper};
use crate::data_structures::sorted::level_generator::{
    LevelGenerator, MAX_HEIGHT, TurboLevelGenerator,
};
use crate::data_structures::sorted::skip_node::{SkipNode, SkipNodePtr};
use crate::error::{Result, SkipListError};
use crate::guard::{DeferredGuard, Guard};
use crate::stats::{NoStats, StatsCollector, StatsSnapshot};
use crate::tracing_helpers::{debug_log, trace_log, warn_log};

// ============================================================================
// FindResult
// ============================================================================

/// Predecessors and successors around a key at every level.
struct FindResult<T> {
    preds: [SkipNodePtr<T>; MAX_HEIGHT],
    succs: [SkipNodePtr<T>; MAX_HEIGHT],
    /// Highest level whose successor carries the searched key.
    found_level: Option<usize>,
}

// ============================================================================
// LazySkipList
// ============================================================================

/// A concurrent ordered set built on a lazy skip list.
///
/// Structure:
/// - Head and tail sentinels; the tail is recognised by address, so every
///   `u64` key (including `u64::MAX`) orders below it
/// - Each node has a tower of (pointer, removal bit) cells
/// - `fully_linked` and `marked` flags drive visibility
///
/// Synchronization:
/// - `contains` and `find` never lock
/// - `insert` locks the predecessors bottom-up, validates, then splices
/// - `erase` locks the victim, marks it, then locks and validates the
///   predecessors before unlinking top-down
/// - Unlinked nodes go to the guard `G` for deferred destruction
///
/// ```text
/// LazySkipList<u64>                                  - DeferredGuard, ordered keys
/// LazySkipList<u64, EpochGuard>                      - epoch-based reclamation
/// LazySkipList<String, DeferredGuard, HashKeyMapper> - hashed keys
/// ```
pub struct LazySkipList<
    T,
    G = DeferredGuard,
    M = OrderedKeyMapper,
    R = TurboLevelGenerator,
    S = NoStats,
> {
    head: SkipNodePtr<T>,
    tail: SkipNodePtr<T>,
    max_height: usize,
    item_counter: AtomicUsize,
    guard: G,
    key_mapper: M,
    level_generator: R,
    stats: S,
}

// Safety: nodes are only reached through the set and values are shared
// between threads by reference and dropped on whichever thread frees them.
unsafe impl<T: Send + Sync, G: Send, M: Send, R: Send, S: Send> Send
    for LazySkipList<T, G, M, R, S>
{
}
unsafe impl<T: Send + Sync, G: Sync, M: Sync, R: Sync, S: Sync> Sync
    for LazySkipList<T, G, M, R, S>
{
}

impl<T: OrderedKey, G: Guard> LazySkipList<T, G> {
    /// Create an empty set with the default configuration.
    pub fn new() -> Self {
        match Self::with_config(SkipListConfig::default()) {
            Ok(set) => set,
            Err(err) => alloc_failure::<T>(err),
        }
    }
}

impl<T: OrderedKey, G: Guard> Default for LazySkipList<T, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G, M, R, S> LazySkipList<T, G, M, R, S>
where
    G: Guard,
    M: KeyMapper<T>,
    R: LevelGenerator,
    S: StatsCollector,
{
    /// Create an empty set from an explicit configuration.
    pub fn with_config(config: SkipListConfig<M, R, S>) -> Result<Self> {
        config.validate()?;
        let SkipListConfig {
            max_height,
            key_mapper,
            level_generator,
            stats,
        } = config;

        let head = SkipNode::alloc_sentinel(0, max_height)?;
        // The tail tower is never read.
        let tail = match SkipNode::alloc_sentinel(u64::MAX, 1) {
            Ok(tail) => tail,
            Err(err) => {
                unsafe { SkipNode::dealloc_node(head) };
                return Err(err);
            }
        };

        unsafe {
            for level in 0..max_height {
                (*head).set_next(level, MarkedPtr::new(tail, false));
            }
        }

        debug_log!(max_height, "lazy skip list created");

        Ok(LazySkipList {
            head,
            tail,
            max_height,
            item_counter: AtomicUsize::new(0),
            guard: G::default(),
            key_mapper,
            level_generator,
            stats,
        })
    }

    // =========================================================================
    // Internal search
    // =========================================================================

    /// Locate the window around `key` at every level.
    ///
    /// Marked and partially linked nodes are traversed like any other node.
    /// Caller must hold a pinned read guard.
    fn find_position(&self, key: u64) -> FindResult<T> {
        let mut preds = [ptr::null_mut(); MAX_HEIGHT];
        let mut succs = [ptr::null_mut(); MAX_HEIGHT];
        let mut found_level = None;

        let mut pred = self.head;
        unsafe {
            for level in (0..self.max_height).rev() {
                let mut curr = (*pred).next_ptr(level);
                while curr != self.tail && (*curr).key() < key {
                    pred = curr;
                    curr = (*curr).next_ptr(level);
                }

                if found_level.is_none() && curr != self.tail && (*curr).key() == key {
                    found_level = Some(level);
                }

                preds[level] = pred;
                succs[level] = curr;
            }
        }

        FindResult {
            preds,
            succs,
            found_level,
        }
    }

    /// Lock-free lookup of a present node.
    ///
    /// Caller must hold a pinned read guard.
    fn find_live(&self, key: u64) -> Option<SkipNodePtr<T>> {
        let mut pred = self.head;
        let mut curr = self.tail;
        unsafe {
            for level in (0..self.max_height).rev() {
                curr = (*pred).next_ptr(level);
                while curr != self.tail && (*curr).key() < key {
                    pred = curr;
                    curr = (*curr).next_ptr(level);
                }
            }

            if curr != self.tail && (*curr).key() == key && (*curr).is_live() {
                self.stats.on_find_fast_success();
                Some(curr)
            } else {
                self.stats.on_find_fast_failed();
                None
            }
        }
    }

    // =========================================================================
    // Locking
    // =========================================================================

    fn lock_node(&self, node: SkipNodePtr<T>) -> MutexGuard<'_, ()> {
        // Nodes locked by an operation outlive it: the caller's pinned guard
        // keeps them allocated.
        let node: &SkipNode<T> = unsafe { &*node };
        match node.try_lock() {
            Some(lock) => lock,
            None => {
                self.stats.on_lock_contention();
                node.lock()
            }
        }
    }

    /// Lock `preds[0..height]` bottom-up. A predecessor shared by consecutive
    /// levels is locked once.
    fn lock_preds(&self, preds: &[SkipNodePtr<T>], height: usize) -> Vec<MutexGuard<'_, ()>> {
        let mut locks = Vec::with_capacity(height);
        let mut prev = ptr::null_mut();
        for &pred in &preds[..height] {
            if pred != prev {
                locks.push(self.lock_node(pred));
                prev = pred;
            }
        }
        locks
    }

    fn back_off(&self, backoff: &Backoff) {
        self.stats.on_backoff();
        backoff.snooze();
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a value.
    ///
    /// Returns `true` if the key was absent, `false` if an equal key is
    /// already present. Aborts through [`handle_alloc_error`] when the node
    /// cannot be allocated; use [`try_insert`](Self::try_insert) to get the
    /// error instead.
    pub fn insert(&self, value: T) -> bool {
        match self.try_insert(value) {
            Ok(inserted) => inserted,
            Err(err) => alloc_failure::<T>(err),
        }
    }

    /// Insert a value, reporting allocation failure as an error.
    pub fn try_insert(&self, value: T) -> Result<bool> {
        let key = self.key_mapper.key_of(&value);
        let height = self.level_generator.next_level() + 1;
        debug_assert!(height <= self.max_height);

        let _guard = G::pin();
        let backoff = Backoff::new();

        loop {
            let found = self.find_position(key);

            if let Some(level) = found.found_level {
                self.stats.on_find_slow_success();
                let existing = unsafe { &*found.succs[level] };

                if !existing.is_marked() {
                    while !existing.is_fully_linked() {
                        self.back_off(&backoff);
                    }
                    self.stats.on_insert_failed();
                    return Ok(false);
                }

                // An equal key is being removed; wait for it to leave.
                self.stats.on_insert_wait_for_removal();
                self.back_off(&backoff);
                continue;
            }
            self.stats.on_find_slow_failed();

            let locks = self.lock_preds(&found.preds, height);

            let valid = (0..height).all(|level| unsafe {
                let pred = &*found.preds[level];
                let succ = found.succs[level];
                !pred.is_marked()
                    && !(*succ).is_marked()
                    && pred.next(level) == MarkedPtr::new(succ, false)
            });

            if !valid {
                unlock(locks);
                trace_log!(key, height, "insert validation failed, retrying");
                self.stats.on_insert_retry();
                self.back_off(&backoff);
                continue;
            }

            let node = match SkipNode::alloc_with_value(value, key, height) {
                Ok(node) => node,
                Err(err) => {
                    unlock(locks);
                    warn_log!(height, "skip node allocation failed");
                    return Err(err);
                }
            };

            unsafe {
                for level in 0..height {
                    (*node).set_next(level, MarkedPtr::new(found.succs[level], false));
                }
                for level in 0..height {
                    (*found.preds[level]).set_next(level, MarkedPtr::new(node, false));
                }

                // Counted before publication: an eraser only decrements after
                // observing `fully_linked`, so the counter never wraps.
                self.item_counter.fetch_add(1, Ordering::Relaxed);
                (*node).set_fully_linked();
            }

            unlock(locks);

            self.stats.on_add_node(height);
            self.stats.on_insert_success();
            return Ok(true);
        }
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Logically delete and physically unlink the node holding `key`.
    ///
    /// Returns the unlinked node, which the caller must retire.
    /// Caller must hold a pinned read guard.
    fn unlink(&self, key: u64) -> Option<SkipNodePtr<T>> {
        let backoff = Backoff::new();
        let mut found = self.find_position(key);

        let Some(level) = found.found_level else {
            self.stats.on_find_slow_failed();
            self.stats.on_erase_failed();
            return None;
        };
        self.stats.on_find_slow_success();

        let victim = found.succs[level];
        let node = unsafe { &*victim };
        if !node.is_fully_linked() || node.height() - 1 != level || node.is_marked() {
            self.stats.on_erase_failed();
            return None;
        }

        let victim_lock = self.lock_node(victim);
        if !node.mark() {
            drop(victim_lock);
            self.stats.on_mark_failed();
            self.stats.on_erase_failed();
            return None;
        }
        self.item_counter.fetch_sub(1, Ordering::Relaxed);

        let height = node.height();
        loop {
            let locks = self.lock_preds(&found.preds, height);

            let valid = (0..height).all(|level| unsafe {
                let pred = &*found.preds[level];
                !pred.is_marked() && pred.next_ptr(level) == victim
            });

            if valid {
                for level in (0..height).rev() {
                    node.mark_level(level);
                    unsafe {
                        (*found.preds[level]).set_next(level, node.next(level).with_mark(false));
                    }
                }

                unlock(locks);
                drop(victim_lock);

                self.stats.on_remove_node(height);
                self.stats.on_erase_success();
                return Some(victim);
            }

            unlock(locks);
            trace_log!(key, height, "erase validation failed, retrying");
            self.stats.on_erase_retry();
            self.back_off(&backoff);
            found = self.find_position(key);
        }
    }

    fn retire(&self, node: SkipNodePtr<T>)
    where
        T: 'static,
    {
        // Safety: `unlink` returned the node unlinked at every level and the
        // victim lock made this thread its only remover.
        unsafe { self.guard.defer_destroy(node, SkipNode::dealloc_node) };
    }

    /// Remove the value with the same key.
    ///
    /// Returns `true` if it was present and this call removed it.
    pub fn erase(&self, value: &T) -> bool
    where
        T: 'static,
    {
        let key = self.key_mapper.key_of(value);
        let _guard = G::pin();
        match self.unlink(key) {
            Some(node) => {
                self.retire(node);
                true
            }
            None => false,
        }
    }

    /// Remove the value with the same key and return a clone of it.
    pub fn remove(&self, value: &T) -> Option<T>
    where
        T: Clone + 'static,
    {
        let key = self.key_mapper.key_of(value);
        let _guard = G::pin();
        let node = self.unlink(key)?;

        // Clone before scheduling destruction
        let data = unsafe { (*node).value().cloned() };
        self.retire(node);
        data
    }

    /// Erase every present value. Values inserted concurrently may survive.
    pub fn clear(&self)
    where
        T: 'static,
    {
        let _guard = G::pin();
        let mut current = self.next_live(self.head);
        while let Some(node) = current {
            current = self.next_live(node);
            let key = unsafe { (*node).key() };
            if let Some(unlinked) = self.unlink(key) {
                self.retire(unlinked);
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Check whether a value with the same key is present.
    pub fn contains(&self, value: &T) -> bool {
        let key = self.key_mapper.key_of(value);
        let _guard = G::pin();
        self.find_live(key).is_some()
    }

    /// Find the stored value with the same key.
    ///
    /// The returned reference is protected according to the guard's
    /// reclamation strategy and stays valid even if the value is erased.
    pub fn find(&self, value: &T) -> Option<G::GuardedRef<'_, T>> {
        let key = self.key_mapper.key_of(value);
        let _guard = G::pin();
        let node = self.find_live(key)?;
        let data = unsafe { (*node).value()? as *const T };

        // Safety: the pinned guard protects the node; make_ref extends the
        // protection to the returned reference.
        unsafe { Some(G::make_ref(data)) }
    }

    /// Find a value and apply `f` to the stored copy.
    pub fn find_and_apply<F, U>(&self, value: &T, f: F) -> Option<U>
    where
        F: FnOnce(&T) -> U,
    {
        let key = self.key_mapper.key_of(value);
        let _guard = G::pin();
        let node = self.find_live(key)?;
        unsafe { (*node).value().map(f) }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of present values.
    ///
    /// Maintained as a counter at the linearization points, so it is exact
    /// when the set is quiescent and approximate under concurrent mutation.
    pub fn len(&self) -> usize {
        self.item_counter.load(Ordering::Relaxed)
    }

    /// `true` when no present value is linked at level 0.
    pub fn is_empty(&self) -> bool {
        let _guard = G::pin();
        self.next_live(self.head).is_none()
    }

    /// Iterate over clones of the present values in key order.
    pub fn iter(&self) -> Iter<'_, T, G, M, R, S> {
        Iter::new(self)
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().collect()
    }

    /// Value with the smallest key.
    pub fn first(&self) -> Option<T>
    where
        T: Clone,
    {
        let _guard = G::pin();
        let node = self.next_live(self.head)?;
        unsafe { (*node).value().cloned() }
    }

    /// Value with the largest key.
    pub fn last(&self) -> Option<T>
    where
        T: Clone,
    {
        let _guard = G::pin();
        unsafe {
            let mut pred = self.head;
            for level in (0..self.max_height).rev() {
                let mut curr = (*pred).next_ptr(level);
                while curr != self.tail {
                    pred = curr;
                    curr = (*curr).next_ptr(level);
                }
            }

            if pred != self.head && (*pred).is_live() {
                return (*pred).value().cloned();
            }

            // The rightmost node is being inserted or removed; scan instead.
            let mut last = None;
            let mut current = self.next_live(self.head);
            while let Some(node) = current {
                last = Some(node);
                current = self.next_live(node);
            }
            last.and_then(|node| (*node).value().cloned())
        }
    }

    /// Snapshot of the configured statistics collector.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn max_height(&self) -> usize {
        self.max_height
    }

    /// The shared guard that receives retired nodes.
    pub fn guard(&self) -> &G {
        &self.guard
    }
}

impl<T, G, M, R, S> LazySkipList<T, G, M, R, S> {
    /// Next present node at level 0 after `node`.
    ///
    /// Caller must hold a pinned read guard and `node` must be protected by it.
    pub(crate) fn next_live(&self, node: SkipNodePtr<T>) -> Option<SkipNodePtr<T>> {
        unsafe {
            let mut curr = (*node).next_ptr(0);
            while curr != self.tail {
                if (*curr).is_live() {
                    return Some(curr);
                }
                curr = (*curr).next_ptr(0);
            }
        }
        None
    }

    pub(crate) fn head(&self) -> SkipNodePtr<T> {
        self.head
    }
}

impl<T, G, M, R, S> Drop for LazySkipList<T, G, M, R, S> {
    fn drop(&mut self) {
        unsafe {
            let mut curr = (*self.head).next_ptr(0);
            while curr != self.tail {
                debug_assert!(
                    !(*curr).is_marked(),
                    "marked node still linked when the set dropped"
                );
                let next = (*curr).next_ptr(0);
                SkipNode::dealloc_node(curr);
                curr = next;
            }

            SkipNode::dealloc_node(self.head);
            SkipNode::dealloc_node(self.tail);
        }
    }
}

impl<'a, T, G, M, R, S> IntoIterator for &'a LazySkipList<T, G, M, R, S>
where
    T: Clone,
    G: Guard,
    M: KeyMapper<T>,
    R: LevelGenerator,
    S: StatsCollector,
{
    type Item = T;
    type IntoIter = Iter<'a, T, G, M, R, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Release predecessor locks in reverse acquisition order.
fn unlock(mut locks: Vec<MutexGuard<'_, ()>>) {
    while let Some(lock) = locks.pop() {
        drop(lock);
    }
}

fn alloc_failure<T>(err: SkipListError) -> ! {
    if let SkipListError::AllocFailed { size, .. } = err {
        if let Ok(layout) = Layout::from_size_align(size, std::mem::align_of::<SkipNode<T>>()) {
            handle_alloc_error(layout);
        }
    }
    panic!("{err}");
}
