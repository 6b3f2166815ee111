//! Basic usage of the `task_pool` crate:
//!
//! * Creating a bounded pool.
//! * Submitting fire-and-forget tasks.
//! * Observing backpressure on a saturated pool.
//! * Releasing the pool.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use task_pool::TaskPool;

fn main() -> Result<(), task_pool::PoolError> {
    // Pool diagnostics (worker spawns, scavenger evictions, panic reports)
    // are tracing events; RUST_LOG=debug makes them visible.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pool = TaskPool::builder()
        .capacity(4)
        .idle_expiry(Duration::from_secs(2))
        .build()?;

    let (done, finished) = mpsc::channel();

    for task_index in 0..16 {
        let done = done.clone();
        pool.submit(move || {
            // Pretend to do some work.
            thread::sleep(Duration::from_millis(10));
            done.send(task_index).unwrap();
        })?;
    }

    for _ in 0..16 {
        let task_index = finished.recv().expect("worker dropped the channel");
        println!("task {task_index} finished");
    }

    println!(
        "16 tasks ran on {} workers (ceiling {})",
        pool.running(),
        pool.capacity().expect("pool is bounded"),
    );

    pool.release();
    Ok(())
}
