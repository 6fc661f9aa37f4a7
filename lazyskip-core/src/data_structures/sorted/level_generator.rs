//! Random tower height generators.
//!
//! A generator returns a *level* in `[0, upper_bound)`; the node height is
//! `level + 1`. Both generators follow `P(level >= k) ≈ 2^-k`.

use std::sync::atomic::{AtomicU32, Ordering};

/// Largest tower height any skip list in this crate supports.
pub const MAX_HEIGHT: usize = 32;

/// Source of node levels, consulted once per insert.
pub trait LevelGenerator: Send + Sync {
    /// Exclusive upper bound of [`next_level`](Self::next_level).
    fn upper_bound(&self) -> usize;

    /// Draw the next level in `[0, upper_bound)`.
    fn next_level(&self) -> usize;
}

// ============================================================================
// TurboLevelGenerator
// ============================================================================

/// Linear congruential generator from Turbo Pascal, as used by Doug Lea's
/// `ConcurrentSkipListMap`.
///
/// The low bits of this recurrence are weak, so the level is taken from the
/// position of the highest set bit, testing the sign bit first.
///
/// The seed is advanced with an atomic read-modify-write, so concurrent
/// draws never observe the same seed twice.
pub struct TurboLevelGenerator {
    seed: AtomicU32,
    upper_bound: u32,
    bit_mask: u32,
}

impl TurboLevelGenerator {
    const MULTIPLIER: u32 = 134_775_813;

    /// Create a generator seeded from process entropy.
    ///
    /// # Panics
    ///
    /// Panics if `upper_bound` is not in `2..=32`.
    pub fn new(upper_bound: usize) -> Self {
        Self::with_seed(upper_bound, fastrand::u32(..))
    }

    /// Create a generator with a fixed seed (reproducible sequences).
    ///
    /// # Panics
    ///
    /// Panics if `upper_bound` is not in `2..=32`.
    pub fn with_seed(upper_bound: usize, seed: u32) -> Self {
        assert!(
            (2..=MAX_HEIGHT).contains(&upper_bound),
            "upper bound {upper_bound} must be in 2..={MAX_HEIGHT}"
        );
        let upper_bound = upper_bound as u32;
        TurboLevelGenerator {
            seed: AtomicU32::new(seed),
            upper_bound,
            bit_mask: (1u32 << (upper_bound - 1)) - 1,
        }
    }

    #[inline]
    fn advance(seed: u32) -> u32 {
        seed.wrapping_mul(Self::MULTIPLIER).wrapping_add(1)
    }

    #[inline]
    fn level_from_seed(&self, x: u32) -> usize {
        if x & 0x8000_0000 == 0 {
            return 0;
        }
        // (x & mask) | 1 is non-zero, so the MSB index is in [0, upper_bound - 2].
        let msb = 31 - ((x & self.bit_mask) | 1).leading_zeros();
        (self.upper_bound - 1 - msb) as usize
    }
}

impl Default for TurboLevelGenerator {
    fn default() -> Self {
        Self::new(MAX_HEIGHT)
    }
}

impl LevelGenerator for TurboLevelGenerator {
    fn upper_bound(&self) -> usize {
        self.upper_bound as usize
    }

    #[inline]
    fn next_level(&self) -> usize {
        let previous = match self
            .seed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |seed| {
                Some(Self::advance(seed))
            }) {
            Ok(seed) | Err(seed) => seed,
        };
        let level = self.level_from_seed(Self::advance(previous));
        debug_assert!(level < self.upper_bound as usize);
        level
    }
}

// ============================================================================
// FastrandLevelGenerator
// ============================================================================

/// Coin-flip generator: counts trailing one bits of a single random word.
///
/// One RNG call per insert instead of one per level.
pub struct FastrandLevelGenerator {
    upper_bound: usize,
}

impl FastrandLevelGenerator {
    /// # Panics
    ///
    /// Panics if `upper_bound` is not in `2..=32`.
    pub fn new(upper_bound: usize) -> Self {
        assert!(
            (2..=MAX_HEIGHT).contains(&upper_bound),
            "upper bound {upper_bound} must be in 2..={MAX_HEIGHT}"
        );
        FastrandLevelGenerator { upper_bound }
    }
}

impl Default for FastrandLevelGenerator {
    fn default() -> Self {
        Self::new(MAX_HEIGHT)
    }
}

impl LevelGenerator for FastrandLevelGenerator {
    fn upper_bound(&self) -> usize {
        self.upper_bound
    }

    #[inline]
    fn next_level(&self) -> usize {
        let random_bits = fastrand::u32(..);
        (random_bits.trailing_ones() as usize).min(self.upper_bound - 1)
    }
}
