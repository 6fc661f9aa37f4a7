//! Data structures for the concurrent set.
//!
//! # Organization
//!
//! - [`sorted`] - The lazy skip list and its strategies (key mapping, level generation)
//! - `internal` - Implementation details (pub(crate))

pub(crate) mod internal;
pub mod sorted;

pub use sorted::{
    FastrandLevelGenerator, HashKeyMapper, Iter, KeyMapper, LazySkipList, LevelGenerator,
    MAX_HEIGHT, OrderedKey, OrderedKeyMapper, TurboLevelGenerator,
};
