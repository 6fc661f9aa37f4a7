//! Lazy skip-list set.
//!
//! The set is parameterized by a guard type `G: Guard` that determines the
//! memory reclamation strategy:
//!
//! - `DeferredGuard`: Testing - defers destruction until the set drops
//! - `EpochGuard`: Production - epoch-based reclamation (crossbeam-epoch)
//!
//! Keys and tower heights come from the injected [`KeyMapper`] and
//! [`LevelGenerator`].

pub mod iter;
pub mod key_mapper;
pub mod lazy_skip_list;
pub mod level_generator;
pub(crate) mod skip_node;

pub use iter::Iter;
pub use key_mapper::{HashKeyMapper, KeyMapper, OrderedKey, OrderedKeyMapper};
pub use lazy_skip_list::LazySkipList;
pub use level_generator::{FastrandLevelGenerator, LevelGenerator, MAX_HEIGHT, TurboLevelGenerator};
