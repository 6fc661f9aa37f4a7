//! A concurrent ordered set built on a lazy skip list.
//!
//! Lookups are lock-free. Insertion and removal lock only the nodes they
//! touch, validate, and retry on conflict. Removal is two-phase: a node is
//! first marked, then unlinked and handed to a [`Guard`] that frees it once
//! no reader can still reach it.
//!
//! ```rust
//! use lazyskip_core::{DeferredGuard, LazySkipList};
//!
//! let set: LazySkipList<u32, DeferredGuard> = LazySkipList::new();
//! set.insert(5);
//! set.insert(1);
//! set.insert(3);
//! assert_eq!(set.to_vec(), vec![1, 3, 5]);
//! assert!(set.erase(&3));
//! assert!(!set.contains(&3));
//! ```

pub mod common_tests;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod guard;
pub mod stats;
mod tracing_helpers;

pub use config::{DEFAULT_MAX_HEIGHT, SkipListConfig};
pub use data_structures::{
    FastrandLevelGenerator, HashKeyMapper, Iter, KeyMapper, LazySkipList, LevelGenerator,
    MAX_HEIGHT, OrderedKey, OrderedKeyMapper, TurboLevelGenerator,
};
pub use error::{Result, SkipListError};
pub use guard::{DeferredGuard, DeferredRef, Guard};
pub use stats::{EventCounter, EventStats, NoStats, StatsCollector, StatsSnapshot};
