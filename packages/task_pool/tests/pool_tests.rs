//! Admission-control and backpressure behavior of [`TaskPool`] and
//! [`FuncPool`]: the concurrency ceiling, nonblocking rejection, the
//! blocking-submitter cap, release semantics, and retuning.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use task_pool::{FuncPool, PoolError, TaskPool};

/// Polls `predicate` until it holds or the deadline passes.
fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

#[test]
fn running_never_exceeds_capacity() {
    const CAPACITY: usize = 3;
    const SUBMITTERS: usize = 8;
    const TASKS_PER_SUBMITTER: usize = 20;

    let pool = Arc::new(TaskPool::new(CAPACITY).unwrap());
    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (done, finished) = mpsc::channel();

    let handles: Vec<_> = (0..SUBMITTERS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            let done = done.clone();

            thread::spawn(move || {
                for _ in 0..TASKS_PER_SUBMITTER {
                    let concurrent = Arc::clone(&concurrent);
                    let peak = Arc::clone(&peak);
                    let done = done.clone();

                    pool.submit(move || {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(1));
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        done.send(()).unwrap();
                    })
                    .unwrap();

                    assert!(pool.running() <= CAPACITY);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    for _ in 0..SUBMITTERS * TASKS_PER_SUBMITTER {
        finished.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= CAPACITY);
    pool.release();
}

#[test]
fn nonblocking_pool_rejects_when_saturated() {
    let pool = TaskPool::builder()
        .capacity(2)
        .nonblocking(true)
        .build()
        .unwrap();

    let started = Arc::new(Barrier::new(3));
    let gate = Arc::new(Barrier::new(3));

    for _ in 0..2 {
        let started = Arc::clone(&started);
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            started.wait();
            gate.wait();
        })
        .unwrap();
    }
    started.wait();

    // Both workers are pinned on the gate; the next admission must fail
    // without any observable delay.
    let before = Instant::now();
    let refused = pool.submit(|| {});
    assert!(matches!(refused, Err(PoolError::PoolOverload)));
    assert!(before.elapsed() < Duration::from_millis(100));

    gate.wait();
    pool.release();
}

#[test]
fn blocking_submitter_cap_rejects_the_excess() {
    let pool = Arc::new(
        TaskPool::builder()
            .capacity(1)
            .max_blocking_submitters(1)
            .build()
            .unwrap(),
    );

    let started = Arc::new(Barrier::new(2));
    let gate = Arc::new(Barrier::new(2));
    {
        let started = Arc::clone(&started);
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            started.wait();
            gate.wait();
        })
        .unwrap();
    }
    started.wait();

    // First extra submitter parks in the blocking queue.
    let blocked_pool = Arc::clone(&pool);
    let (blocked_tx, blocked_rx) = oneshot::channel();
    let blocked = thread::spawn(move || {
        let result = blocked_pool.submit(move || {
            blocked_tx.send(()).unwrap();
        });
        assert!(result.is_ok());
    });

    // Give it time to actually park before exceeding the cap.
    thread::sleep(Duration::from_millis(100));

    // Second extra submitter exceeds max_blocking_submitters.
    let refused = pool.submit(|| {});
    assert!(matches!(refused, Err(PoolError::PoolOverload)));

    // Freeing the worker admits the parked submitter.
    gate.wait();
    blocked_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("blocked submitter's task never ran");
    blocked.join().unwrap();

    pool.release();
}

#[test]
fn release_refuses_submits_and_drains_workers() {
    let pool = TaskPool::new(2).unwrap();
    let (done, finished) = mpsc::channel();

    for _ in 0..2 {
        let done = done.clone();
        pool.submit(move || {
            thread::sleep(Duration::from_millis(20));
            done.send(()).unwrap();
        })
        .unwrap();
    }

    pool.release();
    assert!(pool.is_closed());
    assert!(matches!(pool.submit(|| {}), Err(PoolError::PoolClosed)));

    // In-flight tasks still run to completion, then their workers retire
    // because the pool refuses the revert.
    for _ in 0..2 {
        finished.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || pool.running() == 0));
}

#[test]
fn release_wakes_blocked_submitter_with_pool_closed() {
    let pool = Arc::new(TaskPool::new(1).unwrap());

    let started = Arc::new(Barrier::new(2));
    let gate = Arc::new(Barrier::new(2));
    {
        let started = Arc::clone(&started);
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            started.wait();
            gate.wait();
        })
        .unwrap();
    }
    started.wait();

    let blocked_pool = Arc::clone(&pool);
    let blocked = thread::spawn(move || blocked_pool.submit(|| {}));

    thread::sleep(Duration::from_millis(100));
    pool.release();

    let result = blocked.join().unwrap();
    assert!(matches!(result, Err(PoolError::PoolClosed)));

    gate.wait();
}

#[test]
fn reboot_reopens_a_released_pool() {
    let pool = TaskPool::new(2).unwrap();

    pool.release();
    assert!(matches!(pool.submit(|| {}), Err(PoolError::PoolClosed)));

    pool.reboot();
    assert!(!pool.is_closed());

    let (done_tx, done_rx) = oneshot::channel();
    pool.submit(move || {
        done_tx.send(()).unwrap();
    })
    .unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    pool.release();
}

#[test]
fn tune_raises_the_ceiling_for_new_spawns() {
    let pool = TaskPool::builder()
        .capacity(2)
        .nonblocking(true)
        .build()
        .unwrap();

    let started = Arc::new(Barrier::new(3));
    let gate = Arc::new(Barrier::new(3));
    for _ in 0..2 {
        let started = Arc::clone(&started);
        let gate = Arc::clone(&gate);
        pool.submit(move || {
            started.wait();
            gate.wait();
        })
        .unwrap();
    }
    started.wait();

    assert!(matches!(pool.submit(|| {}), Err(PoolError::PoolOverload)));

    pool.tune(4);
    assert_eq!(pool.capacity(), Some(4));

    let (done_tx, done_rx) = oneshot::channel();
    pool.submit(move || {
        done_tx.send(()).unwrap();
    })
    .unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    gate.wait();
    pool.release();
}

#[test]
fn saturated_then_freed_scenario() {
    // Capacity 2, two 50 ms tasks, an immediate third submission must be
    // refused; retried after the workers free up it must succeed.
    let pool = TaskPool::builder()
        .capacity(2)
        .nonblocking(true)
        .build()
        .unwrap();

    for _ in 0..2 {
        pool.submit(|| thread::sleep(Duration::from_millis(50)))
            .unwrap();
    }

    assert!(matches!(pool.submit(|| {}), Err(PoolError::PoolOverload)));

    thread::sleep(Duration::from_millis(60));
    assert!(wait_until(Duration::from_secs(1), || {
        pool.submit(|| {}).is_ok()
    }));

    pool.release();
}

#[test]
fn idle_worker_is_reused_not_respawned() {
    let pool = TaskPool::new(4).unwrap();

    let (done_tx, done_rx) = oneshot::channel();
    pool.submit(move || {
        done_tx.send(()).unwrap();
    })
    .unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Give the worker a moment to revert into the idle store, then run more
    // tasks through it.
    thread::sleep(Duration::from_millis(20));

    for _ in 0..10 {
        let (done_tx, done_rx) = oneshot::channel();
        pool.submit(move || {
            done_tx.send(()).unwrap();
        })
        .unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(pool.running(), 1);
    pool.release();
}

#[test]
fn func_pool_runs_the_fixed_function() {
    let sum = Arc::new(AtomicUsize::new(0));
    let (done, finished) = mpsc::channel();

    let pool = {
        let sum = Arc::clone(&sum);
        FuncPool::new(2, move |n: usize| {
            sum.fetch_add(n, Ordering::SeqCst);
            done.send(()).unwrap();
        })
        .unwrap()
    };

    for n in 1..=10 {
        pool.invoke(n).unwrap();
    }
    for _ in 0..10 {
        finished.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    assert_eq!(sum.load(Ordering::SeqCst), 55);
    assert!(pool.running() <= 2);

    pool.release();
    assert!(matches!(pool.invoke(11), Err(PoolError::PoolClosed)));
}

#[test]
fn unbounded_pool_reports_no_capacity() {
    let pool = TaskPool::new(0).unwrap();

    assert_eq!(pool.capacity(), None);
    assert_eq!(pool.free(), None);

    let (done_tx, done_rx) = oneshot::channel();
    pool.submit(move || {
        done_tx.send(()).unwrap();
    })
    .unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    pool.release();
}
