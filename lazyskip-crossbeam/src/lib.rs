//! Epoch-based reclamation for lazyskip sets.
//!
//! Provides `EpochGuard`, a `Guard` implementation backed by crossbeam-epoch.
//!
//! # Usage
//!
//! ```rust
//! use lazyskip_core::LazySkipList;
//! use lazyskip_crossbeam::EpochGuard;
//!
//! let set: LazySkipList<i32, EpochGuard> = LazySkipList::new();
//! set.insert(42);
//! assert!(set.contains(&42));
//! ```

pub mod epoch_guard;

pub use epoch_guard::{EpochGuard, EpochRef};
