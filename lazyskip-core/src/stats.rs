//! Event counters for the lazy skip list.
//!
//! The engine only writes to a collector; it never reads counters back, so
//! swapping [`EventStats`] for [`NoStats`] changes no behavior.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::data_structures::sorted::level_generator::MAX_HEIGHT;

/// Hooks called by the skip list at fixed instrumentation points.
///
/// Every hook defaults to a no-op.
pub trait StatsCollector: Default + Send + Sync {
    fn on_insert_success(&self) {}
    fn on_insert_failed(&self) {}
    fn on_insert_retry(&self) {}
    /// Insert found an equal key that is being removed and waited for it.
    fn on_insert_wait_for_removal(&self) {}

    fn on_erase_success(&self) {}
    fn on_erase_failed(&self) {}
    fn on_erase_retry(&self) {}
    /// Erase found the node but another thread marked it first.
    fn on_mark_failed(&self) {}

    /// Lookup served by the lock-free read path (`contains`, `find`).
    fn on_find_fast_success(&self) {}
    fn on_find_fast_failed(&self) {}
    /// Lookup performed on behalf of a mutating operation.
    fn on_find_slow_success(&self) {}
    fn on_find_slow_failed(&self) {}

    /// A node lock was held by another thread when requested.
    fn on_lock_contention(&self) {}
    /// An operation backed off before retrying.
    fn on_backoff(&self) {}

    fn on_add_node(&self, _height: usize) {}
    fn on_remove_node(&self, _height: usize) {}

    /// Point-in-time copy of the counters.
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::default()
    }
}

/// Collector that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStats;

impl StatsCollector for NoStats {}

/// Relaxed atomic counter.
#[derive(Debug, Default)]
pub struct EventCounter(AtomicU64);

impl EventCounter {
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Collector backed by atomic counters.
#[derive(Debug)]
pub struct EventStats {
    node_height_add: [EventCounter; MAX_HEIGHT],
    node_height_del: [EventCounter; MAX_HEIGHT],
    insert_success: EventCounter,
    insert_failed: EventCounter,
    insert_retries: EventCounter,
    insert_wait_for_removal: EventCounter,
    erase_success: EventCounter,
    erase_failed: EventCounter,
    erase_retries: EventCounter,
    mark_failed: EventCounter,
    find_fast_success: EventCounter,
    find_fast_failed: EventCounter,
    find_slow_success: EventCounter,
    find_slow_failed: EventCounter,
    lock_contention: EventCounter,
    backoff: EventCounter,
}

impl Default for EventStats {
    fn default() -> Self {
        EventStats {
            node_height_add: std::array::from_fn(|_| EventCounter::default()),
            node_height_del: std::array::from_fn(|_| EventCounter::default()),
            insert_success: EventCounter::default(),
            insert_failed: EventCounter::default(),
            insert_retries: EventCounter::default(),
            insert_wait_for_removal: EventCounter::default(),
            erase_success: EventCounter::default(),
            erase_failed: EventCounter::default(),
            erase_retries: EventCounter::default(),
            mark_failed: EventCounter::default(),
            find_fast_success: EventCounter::default(),
            find_fast_failed: EventCounter::default(),
            find_slow_success: EventCounter::default(),
            find_slow_failed: EventCounter::default(),
            lock_contention: EventCounter::default(),
            backoff: EventCounter::default(),
        }
    }
}

impl StatsCollector for EventStats {
    fn on_insert_success(&self) {
        self.insert_success.inc();
    }
    fn on_insert_failed(&self) {
        self.insert_failed.inc();
    }
    fn on_insert_retry(&self) {
        self.insert_retries.inc();
    }
    fn on_insert_wait_for_removal(&self) {
        self.insert_wait_for_removal.inc();
    }
    fn on_erase_success(&self) {
        self.erase_success.inc();
    }
    fn on_erase_failed(&self) {
        self.erase_failed.inc();
    }
    fn on_erase_retry(&self) {
        self.erase_retries.inc();
    }
    fn on_mark_failed(&self) {
        self.mark_failed.inc();
    }
    fn on_find_fast_success(&self) {
        self.find_fast_success.inc();
    }
    fn on_find_fast_failed(&self) {
        self.find_fast_failed.inc();
    }
    fn on_find_slow_success(&self) {
        self.find_slow_success.inc();
    }
    fn on_find_slow_failed(&self) {
        self.find_slow_failed.inc();
    }
    fn on_lock_contention(&self) {
        self.lock_contention.inc();
    }
    fn on_backoff(&self) {
        self.backoff.inc();
    }

    fn on_add_node(&self, height: usize) {
        debug_assert!(height > 0 && height <= MAX_HEIGHT);
        self.node_height_add[height - 1].inc();
    }

    fn on_remove_node(&self, height: usize) {
        debug_assert!(height > 0 && height <= MAX_HEIGHT);
        self.node_height_del[height - 1].inc();
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            node_height_add: std::array::from_fn(|i| self.node_height_add[i].get()),
            node_height_del: std::array::from_fn(|i| self.node_height_del[i].get()),
            insert_success: self.insert_success.get(),
            insert_failed: self.insert_failed.get(),
            insert_retries: self.insert_retries.get(),
            insert_wait_for_removal: self.insert_wait_for_removal.get(),
            erase_success: self.erase_success.get(),
            erase_failed: self.erase_failed.get(),
            erase_retries: self.erase_retries.get(),
            mark_failed: self.mark_failed.get(),
            find_fast_success: self.find_fast_success.get(),
            find_fast_failed: self.find_fast_failed.get(),
            find_slow_success: self.find_slow_success.get(),
            find_slow_failed: self.find_slow_failed.get(),
            lock_contention: self.lock_contention.get(),
            backoff: self.backoff.get(),
        }
    }
}

/// Copy of a collector's counters. Counters are read one by one, so a
/// snapshot taken under concurrent mutation is not atomic across fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Nodes added, indexed by `height - 1`.
    pub node_height_add: [u64; MAX_HEIGHT],
    /// Nodes removed, indexed by `height - 1`.
    pub node_height_del: [u64; MAX_HEIGHT],
    pub insert_success: u64,
    pub insert_failed: u64,
    pub insert_retries: u64,
    pub insert_wait_for_removal: u64,
    pub erase_success: u64,
    pub erase_failed: u64,
    pub erase_retries: u64,
    pub mark_failed: u64,
    pub find_fast_success: u64,
    pub find_fast_failed: u64,
    pub find_slow_success: u64,
    pub find_slow_failed: u64,
    pub lock_contention: u64,
    pub backoff: u64,
}

impl StatsSnapshot {
    /// Nodes currently accounted as linked (added minus removed).
    pub fn live_nodes(&self) -> u64 {
        let added: u64 = self.node_height_add.iter().sum();
        let removed: u64 = self.node_height_del.iter().sum();
        added.saturating_sub(removed)
    }
}
