//! Error types for skip-list construction and allocation.
//!
//! Set operations report expected outcomes (duplicate key, absent key) as
//! `bool`. Only conditions the caller must act on are errors.

use thiserror::Error;

/// Errors surfaced by [`LazySkipList`](crate::LazySkipList).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipListError {
    /// The global allocator returned null for a node block.
    #[error("failed to allocate skip node of height {height} ({size} bytes)")]
    AllocFailed { height: usize, size: usize },

    /// Configured maximum tower height is outside the supported range.
    #[error("max height {requested} is outside the supported range 2..={max}")]
    InvalidMaxHeight { requested: usize, max: usize },

    /// The level generator can produce heights the set cannot hold.
    #[error("level generator upper bound {bound} exceeds max height {max_height}")]
    GeneratorBoundExceeded { bound: usize, max_height: usize },
}

pub type Result<T> = std::result::Result<T, SkipListError>;
