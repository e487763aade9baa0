//! Common stress tests for OrderedSet implementations.
//!
//! These tests verify concurrent correctness under high contention.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::data_structures::{Key, OrderedSet};
use crate::history::{DEFAULT_RANGE, History, Workload, check_consistency};

/// Two workers race on add(7): exactly one wins, every round
pub fn test_add_race_single_winner<C>(rounds: usize)
where
    C: OrderedSet + Default + 'static,
{
    let set = Arc::new(C::default());
    let barrier = Arc::new(Barrier::new(2));
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..2)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                let worker = set.register().unwrap();
                for round in 0..rounds {
                    barrier.wait();
                    if set.add(&worker, 7) {
                        wins.fetch_add(1, Ordering::Relaxed);
                    }
                    barrier.wait();

                    if thread_id == 0 {
                        assert_eq!(wins.swap(0, Ordering::Relaxed), 1, "round {}", round);
                        assert!(set.contains(&worker, 7), "round {}", round);
                        assert!(set.remove(&worker, 7));
                    }
                    barrier.wait();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Many workers remove the same value: exactly one succeeds
pub fn test_concurrent_delete_same_value<C>()
where
    C: OrderedSet + Default + 'static,
{
    let set = Arc::new(C::default());
    let num_threads = 16;
    let test_value = 42;

    for _ in 0..200 {
        {
            let worker = set.register().unwrap();
            assert!(set.add(&worker, test_value));
        }

        let success_count = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let set = Arc::clone(&set);
                let success = Arc::clone(&success_count);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let worker = set.register().unwrap();
                    barrier.wait();
                    if set.remove(&worker, test_value) {
                        success.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            success_count.load(Ordering::Relaxed),
            1,
            "Exactly one thread should successfully remove the value"
        );
        let worker = set.register().unwrap();
        assert!(!set.contains(&worker, test_value), "Value should be gone");
    }
}

/// Random add/remove/contains mix, checked against the recorded histories
pub fn test_history_consistency<C>(num_threads: usize, ops_per_thread: usize)
where
    C: OrderedSet + Default + 'static,
{
    let set = Arc::new(C::default());
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let worker = set.register().unwrap();
                let mut workload = Workload::new(thread_id as u64, DEFAULT_RANGE);
                barrier.wait();
                workload.run(&*set, &worker, ops_per_thread)
            })
        })
        .collect();

    let histories: Vec<History> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let worker = set.register().unwrap();
    let report = match check_consistency(&*set, &worker, &histories, 0..DEFAULT_RANGE) {
        Ok(report) => report,
        Err(error) => panic!("{} is not linearizable: {}", set.name(), error),
    };

    assert_eq!(
        report.present,
        set.snapshot(&worker, usize::MAX).len(),
        "snapshot disagrees with the histories"
    );
    println!(
        "{}: {} adds, {} removes, {} present",
        set.name(),
        report.successful_adds,
        report.successful_removes,
        report.present
    );
}

/// Heavy add/remove churn on a tiny range while readers traverse.
///
/// Nodes are unlinked and handed back constantly; in debug builds a
/// traversal that reaches a reclaimed node trips the poison assertion.
pub fn test_small_range_churn<C>()
where
    C: OrderedSet + Default + 'static,
{
    const RANGE: Key = 64;

    let set = Arc::new(C::default());
    let stop = Arc::new(AtomicBool::new(false));
    let mut writers = vec![];
    let mut readers = vec![];

    for t in 0..6 {
        let set = Arc::clone(&set);
        writers.push(thread::spawn(move || {
            let worker = set.register().unwrap();
            for i in 0..20_000 {
                let value = (i * 7 + t * 13) % RANGE;
                if i % 2 == 0 {
                    set.add(&worker, value);
                } else {
                    set.remove(&worker, value);
                }
            }
        }));
    }

    for _ in 0..4 {
        let set = Arc::clone(&set);
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            let worker = set.register().unwrap();
            let mut seen = 0usize;
            while !stop.load(Ordering::Relaxed) {
                for value in 0..RANGE {
                    if set.contains(&worker, value) {
                        seen += 1;
                    }
                }
                let values = set.snapshot(&worker, usize::MAX);
                assert!(values.iter().all(|value| (0..RANGE).contains(value)));
            }
            seen
        }));
    }

    for handle in writers {
        handle.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }

    let worker = set.register().unwrap();
    let values = set.snapshot(&worker, usize::MAX);
    assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
}

/// Concurrent contains on a stable prefix while the suffix changes
pub fn test_contains_during_modifications<C>()
where
    C: OrderedSet + Default + 'static,
{
    let set = Arc::new(C::default());
    {
        let worker = set.register().unwrap();
        for i in 0..500 {
            assert!(set.add(&worker, i * 2));
        }
    }

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = vec![];

    // Modifier threads, values above the stable prefix
    for t in 0..4 {
        let set = Arc::clone(&set);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let worker = set.register().unwrap();
            barrier.wait();
            for i in 0..5_000 {
                let value = 10_000 + t * 10_000 + (i % 500);
                if i % 2 == 0 {
                    set.add(&worker, value);
                } else {
                    set.remove(&worker, value - 1);
                }
            }
        }));
    }

    // Finder threads, stable values must always be visible
    for _ in 0..4 {
        let set = Arc::clone(&set);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let worker = set.register().unwrap();
            barrier.wait();
            for _ in 0..10 {
                for i in 0..1000 {
                    assert_eq!(set.contains(&worker, i), i % 2 == 0, "value {}", i);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
