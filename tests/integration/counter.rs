//! Conservation of the sharded counter under real thread interleavings.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use percpu::{set_current_worker_id, Counter, ParallelismDegree, WorkerShardIndex};

const WORKERS: i64 = 100;
const ADDS_PER_WORKER: i64 = 100;

#[test]
fn interleaved_resets_conserve_total() {
    let c = Arc::new(Counter::new());
    let reset_sum = Arc::new(AtomicI64::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let c = Arc::clone(&c);
            let reset_sum = Arc::clone(&reset_sum);
            thread::spawn(move || {
                for i in 0..ADDS_PER_WORKER {
                    c.add(1);
                    if i % 20 == 0 {
                        reset_sum.fetch_add(c.reset(), Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let remaining = c.load();
    let resets = reset_sum.load(Ordering::Relaxed);
    assert_eq!(
        resets + remaining,
        WORKERS * ADDS_PER_WORKER,
        "resets returned {resets}, {remaining} left over"
    );

    assert_eq!(c.reset(), remaining);
    assert_eq!(c.load(), 0);
}

#[test]
fn reset_racing_adds_then_load_after_join() {
    for _ in 0..500 {
        let c = Arc::new(Counter::new());
        let start = Arc::new(Barrier::new(2));

        let writer = {
            let c = Arc::clone(&c);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                c.add(1);
                c.add(2);
            })
        };

        start.wait();
        let t0 = c.reset();
        writer.join().unwrap();
        let t1 = c.load();

        assert!((0..=3).contains(&t0), "t0 = {t0}");
        assert_eq!(t0 + t1, 3, "t0 = {t0}, t1 = {t1}");
    }
}

#[test]
fn zero_adds_never_move_the_total() {
    let c = Arc::new(Counter::new());
    c.add(42);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    c.add(0);
                }
            })
        })
        .collect();
    for _ in 0..1_000 {
        assert_eq!(c.load(), 42);
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.load(), 42);
}

#[test]
fn worker_ids_route_to_own_shard() {
    let shards = 4;
    let c = Arc::new(Counter::with_provider(
        ParallelismDegree::new(shards).unwrap(),
        WorkerShardIndex,
    ));

    let handles: Vec<_> = (0..shards)
        .map(|id| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                set_current_worker_id(Some(id));
                for _ in 0..1_000 {
                    c.add(id as i64 + 1);
                }
                set_current_worker_id(None);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(c.load(), 1_000 * (1 + 2 + 3 + 4));
}

#[test]
fn negative_deltas_cancel() {
    let c = Arc::new(Counter::new());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let c = Arc::clone(&c);
            let delta = if i % 2 == 0 { 3 } else { -3 };
            thread::spawn(move || {
                for _ in 0..1_000 {
                    c.add(delta);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.load(), 0);
}
