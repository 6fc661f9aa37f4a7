//! Construction-time configuration for [`LazySkipList`](crate::LazySkipList).
//!
//! ```rust
//! use lazyskip_core::{DeferredGuard, EventStats, LazySkipList, SkipListConfig, TurboLevelGenerator};
//!
//! let config = SkipListConfig::default()
//!     .max_height(16)
//!     .level_generator(TurboLevelGenerator::with_seed(16, 7))
//!     .stats(EventStats::default());
//!
//! let set: LazySkipList<u32, DeferredGuard, _, _, _> = LazySkipList::with_config(config).unwrap();
//! assert!(set.insert(1));
//! assert_eq!(set.stats().insert_success, 1);
//! ```

use crate::data_structures::sorted::key_mapper::OrderedKeyMapper;
use crate::data_structures::sorted::level_generator::{
    LevelGenerator, MAX_HEIGHT, TurboLevelGenerator,
};
use crate::error::{Result, SkipListError};
use crate::stats::NoStats;

/// Default tower bound.
pub const DEFAULT_MAX_HEIGHT: usize = MAX_HEIGHT;

/// Strategies and limits injected into a skip list at construction.
///
/// Not runtime-mutable: the set takes ownership of the config.
#[derive(Debug, Clone)]
pub struct SkipListConfig<M = OrderedKeyMapper, R = TurboLevelGenerator, S = NoStats> {
    pub(crate) max_height: usize,
    pub(crate) key_mapper: M,
    pub(crate) level_generator: R,
    pub(crate) stats: S,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        SkipListConfig {
            max_height: DEFAULT_MAX_HEIGHT,
            key_mapper: OrderedKeyMapper,
            level_generator: TurboLevelGenerator::new(DEFAULT_MAX_HEIGHT),
            stats: NoStats,
        }
    }
}

impl<M, R, S> SkipListConfig<M, R, S> {
    /// Tower bound for every node, sentinels included.
    ///
    /// The default generator draws up to 32 levels; lowering the bound
    /// requires a generator whose upper bound fits under it.
    pub fn max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }

    pub fn key_mapper<M2>(self, key_mapper: M2) -> SkipListConfig<M2, R, S> {
        SkipListConfig {
            max_height: self.max_height,
            key_mapper,
            level_generator: self.level_generator,
            stats: self.stats,
        }
    }

    pub fn level_generator<R2>(self, level_generator: R2) -> SkipListConfig<M, R2, S> {
        SkipListConfig {
            max_height: self.max_height,
            key_mapper: self.key_mapper,
            level_generator,
            stats: self.stats,
        }
    }

    pub fn stats<S2>(self, stats: S2) -> SkipListConfig<M, R, S2> {
        SkipListConfig {
            max_height: self.max_height,
            key_mapper: self.key_mapper,
            level_generator: self.level_generator,
            stats,
        }
    }

    pub fn max_height_value(&self) -> usize {
        self.max_height
    }
}

impl<M, R: LevelGenerator, S> SkipListConfig<M, R, S> {
    /// Check limits before any allocation happens.
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_HEIGHT).contains(&self.max_height) {
            return Err(SkipListError::InvalidMaxHeight {
                requested: self.max_height,
                max: MAX_HEIGHT,
            });
        }

        let bound = self.level_generator.upper_bound();
        if bound > self.max_height {
            return Err(SkipListError::GeneratorBoundExceeded {
                bound,
                max_height: self.max_height,
            });
        }

        Ok(())
    }
}
