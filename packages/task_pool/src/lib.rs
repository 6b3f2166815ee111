#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A reusable worker-thread pool for an unbounded stream of short-lived,
//! fire-and-forget tasks.
//!
//! Spawning one thread per task is wasteful and unbounded; this package runs
//! tasks over a bounded (or capped-unbounded) set of recycled worker threads
//! instead, enforcing a hard concurrency ceiling with configurable
//! backpressure and reclaiming workers that sit idle too long.
//!
//! Two frontends share the same engine:
//!
//! * [`TaskPool`] - every submission is its own closure.
//! * [`FuncPool`] - the function is fixed at construction; submissions carry
//!   only its argument.
//!
//! # How admission works
//!
//! Each submission reuses the most recently idled worker if one exists,
//! spawns a new worker while under capacity, and otherwise applies
//! backpressure: blocking pools park the submitter until a worker frees up
//! (optionally capped via [`max_blocking_submitters`][1]), nonblocking pools
//! fail immediately with [`PoolError::PoolOverload`].
//!
//! A background scavenger retires workers idle past the configured expiry, so
//! a quiet pool shrinks back toward zero threads. Panicking tasks are
//! contained by their worker and reported through a configurable
//! [panic handler][2] or [logging sink][PoolLogger]; the pool keeps serving.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::{Arc, mpsc};
//!
//! use task_pool::TaskPool;
//!
//! let pool = TaskPool::new(4)?;
//! let counter = Arc::new(AtomicU32::new(0));
//! let (done, finished) = mpsc::channel();
//!
//! for _ in 0..16 {
//!     let counter = Arc::clone(&counter);
//!     let done = done.clone();
//!     pool.submit(move || {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!         done.send(()).unwrap();
//!     })?;
//! }
//!
//! for _ in 0..16 {
//!     finished.recv().unwrap();
//! }
//!
//! assert_eq!(counter.load(Ordering::Relaxed), 16);
//! assert!(pool.running() <= 4);
//!
//! pool.release();
//! # Ok::<(), task_pool::PoolError>(())
//! ```
//!
//! Tasks are serialized per worker but unordered across workers; there is no
//! result plumbing, per-task cancellation, or priority scheduling.
//!
//! [1]: PoolBuilder::max_blocking_submitters
//! [2]: PoolBuilder::panic_handler

mod builder;
mod constants;
mod error;
mod func_pool;
mod logger;
mod pool;
mod raw;
mod scavenger;
mod shell;
mod store;
mod worker;

pub use builder::{PanicHandler, PoolBuilder};
pub use error::PoolError;
pub use func_pool::FuncPool;
pub use logger::{PoolLogger, TracingLogger};
pub use pool::TaskPool;
