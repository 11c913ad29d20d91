#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hgraph::{CancelToken, GraphError, LockOptions, LockRegistry};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const THREADS: usize = 8;
const ROUNDS: usize = 2_000;

#[test]
fn lock_provides_mutual_exclusion() {
    let registry = Arc::new(LockRegistry::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let inside = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let counter = Arc::clone(&counter);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    registry.lock(7);
                    assert!(!inside.swap(true, Ordering::SeqCst), "two holders of id 7");
                    // Non-atomic read-modify-write; only exclusion keeps it exact.
                    let value = counter.load(Ordering::Relaxed);
                    counter.store(value + 1, Ordering::Relaxed);
                    inside.store(false, Ordering::SeqCst);
                    registry.unlock(7);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), THREADS * ROUNDS);
}

#[test]
fn distinct_ids_do_not_block_each_other() {
    let registry = Arc::new(LockRegistry::default());
    registry.lock(1);
    let other = Arc::clone(&registry);
    let handle = thread::spawn(move || {
        other.lock(2);
        other.unlock(2);
    });
    handle.join().unwrap();
    registry.unlock(1);
}

#[test]
fn randomized_cycles_leave_every_id_free() {
    let registry = Arc::new(LockRegistry::new(&LockOptions::default().shards(4)));
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(0x10c4 + t as u64);
                for _ in 0..ROUNDS {
                    let id = rng.gen_range(1..=32u64);
                    let _guard = registry.guard(id);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    for id in 1..=32u64 {
        assert!(registry.try_lock(id), "id {id} left held");
        registry.unlock(id);
    }
}

#[test]
fn cancelled_waiter_is_not_a_holder() {
    let registry = Arc::new(LockRegistry::new(
        &LockOptions::default().cancel_poll_interval(Duration::from_millis(1)),
    ));
    registry.lock(5);
    let cancel = CancelToken::new();

    let waiter = {
        let registry = Arc::clone(&registry);
        let cancel = cancel.clone();
        thread::spawn(move || registry.lock_cancellable(5, &cancel))
    };
    thread::sleep(Duration::from_millis(20));
    cancel.cancel();
    assert_eq!(waiter.join().unwrap(), Err(GraphError::Cancelled(5)));

    registry.unlock(5);
    assert!(registry.try_lock(5));
    registry.unlock(5);
}

#[test]
fn any_thread_may_release_a_held_id() {
    let registry = Arc::new(LockRegistry::default());
    let handle = registry.acquire(9);
    let released = thread::spawn(move || handle.release());
    released.join().unwrap();
    assert!(registry.try_lock(9));
    registry.unlock(9);
}
