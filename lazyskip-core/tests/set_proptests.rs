//! Property-based tests for the lazy skip list.
//!
//! Single-threaded differential testing against `BTreeSet` as an oracle.

use std::collections::BTreeSet;

use lazyskip_core::{
    DeferredGuard, FastrandLevelGenerator, LazySkipList, LevelGenerator, SkipListConfig,
    TurboLevelGenerator,
};
use proptest::prelude::*;

/// Operations for random testing.
#[derive(Debug, Clone)]
enum Op {
    Insert(i16),
    Erase(i16),
    Remove(i16),
    Contains(i16),
}

/// Strategy for a narrow key range so operations collide often.
fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    let key = -64i16..64;
    prop::collection::vec(
        prop_oneof![
            3 => key.clone().prop_map(Op::Insert),
            2 => key.clone().prop_map(Op::Erase),
            1 => key.clone().prop_map(Op::Remove),
            2 => key.prop_map(Op::Contains),
        ],
        0..=max_ops,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every operation agrees with `BTreeSet`, and so does the final walk.
    #[test]
    fn matches_btree_set(ops in operations(300)) {
        let set: LazySkipList<i16, DeferredGuard> = LazySkipList::new();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(k) => prop_assert_eq!(set.insert(k), oracle.insert(k)),
                Op::Erase(k) => prop_assert_eq!(set.erase(&k), oracle.remove(&k)),
                Op::Remove(k) => prop_assert_eq!(set.remove(&k), oracle.take(&k)),
                Op::Contains(k) => prop_assert_eq!(set.contains(&k), oracle.contains(&k)),
            }
            prop_assert_eq!(set.len(), oracle.len());
        }

        prop_assert_eq!(set.to_vec(), oracle.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(set.first(), oracle.first().copied());
        prop_assert_eq!(set.last(), oracle.last().copied());
        prop_assert_eq!(set.is_empty(), oracle.is_empty());
    }

    /// Iteration is strictly increasing for any insertion order.
    #[test]
    fn iteration_is_sorted(values in prop::collection::vec(any::<u64>(), 0..200)) {
        let set: LazySkipList<u64, DeferredGuard> = LazySkipList::new();
        for v in &values {
            set.insert(*v);
        }

        let items = set.to_vec();
        prop_assert!(items.windows(2).all(|w| w[0] < w[1]));

        let expected: BTreeSet<u64> = values.into_iter().collect();
        prop_assert_eq!(items.len(), expected.len());
    }

    /// The same seed always yields the same levels, all within the bound.
    #[test]
    fn seeded_generator_is_reproducible(seed: u32, upper_bound in 2usize..=32) {
        let a = TurboLevelGenerator::with_seed(upper_bound, seed);
        let b = TurboLevelGenerator::with_seed(upper_bound, seed);

        for _ in 0..10 {
            let level = a.next_level();
            prop_assert_eq!(level, b.next_level());
            prop_assert!(level < upper_bound);
        }
    }

    /// Sets with a short tower bound keep set semantics.
    #[test]
    fn short_towers_match_btree_set(
        max_height in 2usize..=6,
        ops in operations(200),
    ) {
        let config = SkipListConfig::default()
            .max_height(max_height)
            .level_generator(FastrandLevelGenerator::new(max_height));
        let set: LazySkipList<i16, DeferredGuard, _, _, _> =
            LazySkipList::with_config(config).unwrap();
        let mut oracle = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(k) => prop_assert_eq!(set.insert(k), oracle.insert(k)),
                Op::Erase(k) | Op::Remove(k) => prop_assert_eq!(set.erase(&k), oracle.remove(&k)),
                Op::Contains(k) => prop_assert_eq!(set.contains(&k), oracle.contains(&k)),
            }
        }

        prop_assert_eq!(set.to_vec(), oracle.into_iter().collect::<Vec<_>>());
    }
}
