//! Shard selection and visitation of `ShardedValues` across threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use percpu::{
    set_current_worker_id, CpuShardIndex, ParallelismDegree, ShardedValues, ThreadShardIndex,
    WorkerShardIndex,
};

#[test]
fn shard_index_in_range_from_every_thread() {
    let p = ParallelismDegree::new(3).unwrap();
    let values = Arc::new(ShardedValues::with_parallelism(p, || AtomicU64::new(0)));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let values = Arc::clone(&values);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let i = values.shard_index();
                    assert!(i < values.shard_count(), "index {i} out of range");
                    values.get().fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut total = 0;
    values.for_each(|v| total += v.load(Ordering::Relaxed));
    assert_eq!(total, 32 * 1_000);
}

#[test]
fn for_each_visits_exactly_p_slots() {
    for n in [1, 2, 7, 64] {
        let p = ParallelismDegree::new(n).unwrap();
        let values = ShardedValues::with_provider(p, ThreadShardIndex, || 1u32);
        let mut visited = 0;
        values.for_each(|v| visited += *v);
        assert_eq!(visited as usize, n);
        assert_eq!(values.iter().len(), n);
    }
}

#[test]
fn one_worker_per_shard_spreads_evenly() {
    let shards = 8;
    let p = ParallelismDegree::new(shards).unwrap();
    let values = Arc::new(ShardedValues::with_provider(p, WorkerShardIndex, || {
        AtomicU64::new(0)
    }));

    let handles: Vec<_> = (0..shards)
        .map(|id| {
            let values = Arc::clone(&values);
            thread::spawn(move || {
                set_current_worker_id(Some(id));
                for _ in 0..500 {
                    values.get().fetch_add(1, Ordering::Relaxed);
                }
                set_current_worker_id(None);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let counts: Vec<u64> = values.iter().map(|v| v.load(Ordering::Relaxed)).collect();
    assert_eq!(counts, vec![500; shards]);
}

#[test]
fn worker_ids_past_p_wrap_around() {
    let p = ParallelismDegree::new(4).unwrap();
    let values = ShardedValues::with_provider(p, WorkerShardIndex, || ());
    let seen = thread::spawn(move || {
        (0..12)
            .map(|id| {
                set_current_worker_id(Some(id));
                values.shard_index()
            })
            .collect::<Vec<_>>()
    })
    .join()
    .unwrap();
    assert_eq!(seen, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
}

#[cfg(target_os = "linux")]
#[test]
fn pinned_threads_select_their_cpu_rank() {
    use percpu::affinity;

    let Ok(allowed) = affinity::allowed_cpus() else {
        eprintln!("skipping: allowed CPU set unavailable");
        return;
    };
    let cpus: Vec<usize> = allowed.iter().collect();
    if cpus.len() < 2 {
        eprintln!("skipping: fewer than two allowed CPUs");
        return;
    }

    let p = ParallelismDegree::new(cpus.len()).unwrap();
    let values = Arc::new(ShardedValues::with_provider(
        p,
        CpuShardIndex::from_cpus(cpus.iter().copied()),
        || AtomicU64::new(0),
    ));

    let handles: Vec<_> = cpus
        .iter()
        .copied()
        .enumerate()
        .map(|(rank, cpu)| {
            let values = Arc::clone(&values);
            thread::spawn(move || {
                if affinity::pin_current_thread_to_core(cpu).is_err() {
                    return None;
                }
                let index = values.shard_index();
                values.get().fetch_add(1, Ordering::Relaxed);
                Some((rank, index))
            })
        })
        .collect();

    let mut pinned = 0;
    for h in handles {
        if let Some((rank, index)) = h.join().unwrap() {
            assert_eq!(index, rank, "thread pinned to rank {rank} chose shard {index}");
            pinned += 1;
        }
    }
    if pinned < cpus.len() {
        eprintln!("skipping balance check: only {pinned} of {} threads pinned", cpus.len());
        return;
    }
    assert!(values.iter().all(|v| v.load(Ordering::Relaxed) == 1));
}
