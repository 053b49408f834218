//! Sequential model check for `Counter`.
//!
//! A single thread drives arbitrary add/load/reset sequences with arbitrary
//! shard hints; the observable totals must match a plain `i64`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use percpu::{Counter, ParallelismDegree};

#[derive(Clone, Debug)]
enum Op {
    Add { hint: usize, delta: i64 },
    Load,
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (any::<usize>(), any::<i64>()).prop_map(|(hint, delta)| Op::Add { hint, delta }),
        2 => (any::<usize>(), -1_000i64..1_000).prop_map(|(hint, delta)| Op::Add { hint, delta }),
        1 => Just(Op::Load),
        1 => Just(Op::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn counter_matches_sequential_model(
        shards in 1usize..17,
        ops in prop::collection::vec(op_strategy(), 0..200),
    ) {
        let hint = Arc::new(AtomicUsize::new(0));
        let provider = {
            let hint = Arc::clone(&hint);
            move || hint.load(Ordering::Relaxed)
        };
        let counter = Counter::with_provider(ParallelismDegree::new(shards).unwrap(), provider);
        let mut model: i64 = 0;

        for op in ops {
            match op {
                Op::Add { hint: h, delta } => {
                    hint.store(h, Ordering::Relaxed);
                    counter.add(delta);
                    model = model.wrapping_add(delta);
                }
                Op::Load => prop_assert_eq!(counter.load(), model),
                Op::Reset => {
                    prop_assert_eq!(counter.reset(), model);
                    model = 0;
                }
            }
        }
        prop_assert_eq!(counter.load(), model);
        prop_assert_eq!(counter.reset(), model);
        prop_assert_eq!(counter.load(), 0);
    }
}
