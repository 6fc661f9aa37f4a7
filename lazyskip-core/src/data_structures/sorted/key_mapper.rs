//! Value to key mapping.
//!
//! The skip list orders and deduplicates by a `u64` key derived from each
//! value. Two values with the same key are the same set member.

use std::hash::{BuildHasher, Hash, RandomState};

/// Derives the ordering key of a value.
///
/// Must be deterministic: the same value always maps to the same key.
pub trait KeyMapper<T>: Send + Sync {
    fn key_of(&self, value: &T) -> u64;
}

impl<T, F> KeyMapper<T> for F
where
    F: Fn(&T) -> u64 + Send + Sync,
{
    #[inline]
    fn key_of(&self, value: &T) -> u64 {
        self(value)
    }
}

/// Types with an order-preserving embedding into `u64`.
///
/// `a < b` implies `a.ordered_key() < b.ordered_key()`.
pub trait OrderedKey {
    fn ordered_key(&self) -> u64;
}

macro_rules! ordered_key_unsigned {
    ($($t:ty),*) => {$(
        impl OrderedKey for $t {
            #[inline]
            fn ordered_key(&self) -> u64 {
                *self as u64
            }
        }
    )*};
}

// Flip the sign bit so negative values sort below positive ones.
macro_rules! ordered_key_signed {
    ($($t:ty),*) => {$(
        impl OrderedKey for $t {
            #[inline]
            fn ordered_key(&self) -> u64 {
                (*self as i64 as u64) ^ (1 << 63)
            }
        }
    )*};
}

ordered_key_unsigned!(u8, u16, u32, u64, usize);
ordered_key_signed!(i8, i16, i32, i64, isize);

impl OrderedKey for char {
    #[inline]
    fn ordered_key(&self) -> u64 {
        u64::from(*self)
    }
}

impl OrderedKey for bool {
    #[inline]
    fn ordered_key(&self) -> u64 {
        u64::from(*self)
    }
}

/// Default mapper: the value's own order via [`OrderedKey`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedKeyMapper;

impl<T: OrderedKey> KeyMapper<T> for OrderedKeyMapper {
    #[inline]
    fn key_of(&self, value: &T) -> u64 {
        value.ordered_key()
    }
}

/// Hash-derived keys.
///
/// Any `Hash` type can be stored. Iteration follows hash order, and values
/// whose hashes collide are treated as the same member.
#[derive(Clone, Debug, Default)]
pub struct HashKeyMapper<S = RandomState> {
    hasher: S,
}

impl HashKeyMapper {
    /// Mapper seeded with a fresh `RandomState`.
    pub fn new() -> Self {
        HashKeyMapper::with_hasher(RandomState::new())
    }
}

impl<S> HashKeyMapper<S> {
    pub fn with_hasher(hasher: S) -> Self {
        HashKeyMapper { hasher }
    }
}

impl<T: Hash, S: BuildHasher + Send + Sync> KeyMapper<T> for HashKeyMapper<S> {
    #[inline]
    fn key_of(&self, value: &T) -> u64 {
        self.hasher.hash_one(value)
    }
}
