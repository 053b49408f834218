//! Shard selection and per-shard seed derivation for arbitrary inputs.

use proptest::prelude::*;

use percpu::{ParallelismDegree, Pcg128, ShardedValues, Source};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn any_hint_lands_in_range(shards in 1usize..256, hint in any::<usize>()) {
        let values = ShardedValues::with_provider(
            ParallelismDegree::new(shards).unwrap(),
            move || hint,
            || (),
        );
        let index = values.shard_index();
        prop_assert!(index < shards);
        prop_assert_eq!(index, hint % shards);
    }

    #[test]
    fn shard_seeds_are_consecutive(shards in 1usize..64, seed in any::<u64>()) {
        let source = Source::with_seed_and_parallelism(seed, ParallelismDegree::new(shards).unwrap());
        let expected: Vec<u64> = (0..shards as u64).map(|i| seed.wrapping_add(i)).collect();
        prop_assert_eq!(source.shard_seeds(), expected);

        source.reseed(seed ^ 0xA5A5);
        let reseeded: Vec<u64> = (0..shards as u64).map(|i| (seed ^ 0xA5A5).wrapping_add(i)).collect();
        prop_assert_eq!(source.shard_seeds(), reseeded);
    }

    #[test]
    fn single_shard_source_follows_pcg(seed in any::<u64>(), draws in 1usize..64) {
        let source = Source::with_seed_and_provider(
            seed,
            ParallelismDegree::ONE,
            || 0usize,
        );
        let mut reference = Pcg128::new(seed);
        for _ in 0..draws {
            prop_assert_eq!(source.next_u64(), reference.next_u64());
        }
    }
}
