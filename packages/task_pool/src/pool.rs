use std::sync::Arc;

use crate::builder::PoolBuilder;
use crate::error::PoolError;
use crate::raw::RawPool;

/// The payload a [`TaskPool`] worker executes: an arbitrary boxed closure.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// A pool of reusable worker threads that executes submitted closures.
///
/// Submitting a task either hands it to an idle worker, spawns a fresh worker
/// while under capacity, or applies backpressure: by default the submitter
/// blocks until a worker frees up, while [`nonblocking`][1] pools (and
/// submitters beyond the [blocking cap][2]) fail immediately with
/// [`PoolError::PoolOverload`].
///
/// Tasks are fire-and-forget: `submit` returns as soon as a worker has
/// accepted the task, and no result channel exists. Tasks running on the same
/// worker are serialized; across workers there is no ordering guarantee.
///
/// Workers idle longer than the configured expiry are retired by a background
/// scavenger, so an idle pool shrinks back toward zero threads. A task that
/// panics is contained by its worker: the panic is reported through the
/// configured [panic handler][3] or [logger][4] and the worker returns to
/// service.
///
/// Dropping the pool [releases][Self::release] it.
///
/// # Example
///
/// ```
/// use std::sync::mpsc;
///
/// use task_pool::TaskPool;
///
/// let pool = TaskPool::new(4)?;
/// let (done, results) = mpsc::channel();
///
/// for i in 0..8 {
///     let done = done.clone();
///     pool.submit(move || {
///         done.send(i * i).unwrap();
///     })?;
/// }
///
/// let total: i32 = results.iter().take(8).sum();
/// assert_eq!(total, 140);
///
/// pool.release();
/// # Ok::<(), task_pool::PoolError>(())
/// ```
///
/// [1]: PoolBuilder::nonblocking
/// [2]: PoolBuilder::max_blocking_submitters
/// [3]: PoolBuilder::panic_handler
/// [4]: PoolBuilder::logger
pub struct TaskPool {
    raw: Arc<RawPool<Task>>,
}

impl TaskPool {
    /// Creates a pool with the given worker-count ceiling and default
    /// configuration. A capacity of zero leaves the pool unbounded.
    ///
    /// # Errors
    ///
    /// The default configuration is always valid; the fallible signature
    /// exists for parity with [`builder()`][Self::builder] construction.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a pool with customized configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use task_pool::TaskPool;
    ///
    /// let pool = TaskPool::builder()
    ///     .capacity(2)
    ///     .max_blocking_submitters(16)
    ///     .build()?;
    /// # pool.release();
    /// # Ok::<(), task_pool::PoolError>(())
    /// ```
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn from_raw(raw: Arc<RawPool<Task>>) -> Self {
        Self { raw }
    }

    /// Submits a task for asynchronous execution on some worker.
    ///
    /// Returns as soon as a worker has accepted the task; never waits for the
    /// task to run. May block the calling thread only when the pool is
    /// saturated and blocking admission is enabled.
    ///
    /// # Errors
    ///
    /// * [`PoolError::PoolClosed`] - the pool was released and not rebooted.
    /// * [`PoolError::PoolOverload`] - the pool is saturated and configured
    ///   to reject rather than block, or the blocking-submitter cap was hit.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.raw.submit(Box::new(task))
    }

    /// The number of currently live workers.
    #[must_use]
    pub fn running(&self) -> usize {
        self.raw.running()
    }

    /// Admission slots still open, or `None` for an unbounded pool.
    #[must_use]
    pub fn free(&self) -> Option<usize> {
        self.raw.free()
    }

    /// The worker-count ceiling, or `None` for an unbounded pool.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.raw.capacity()
    }

    /// Changes the worker-count ceiling.
    ///
    /// Ignored for unbounded and preallocated pools and for a zero argument.
    /// Workers already running are unaffected; a shrunken ceiling takes
    /// effect as busy workers finish and retire instead of going idle.
    pub fn tune(&self, capacity: usize) {
        self.raw.tune(capacity);
    }

    /// Whether the pool has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.raw.is_closed()
    }

    /// Closes the pool: idle workers retire immediately, blocked submitters
    /// fail with [`PoolError::PoolClosed`], and every subsequent submit is
    /// refused. Tasks already dispatched run to completion.
    pub fn release(&self) {
        self.raw.release();
    }

    /// Reopens a released pool, restarting the scavenger. Admission resumes
    /// with zero live workers.
    pub fn reboot(&self) {
        self.raw.reboot();
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool").field("raw", &self.raw).finish()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.raw.release();
    }
}
