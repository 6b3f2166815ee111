use std::sync::Arc;

use crate::builder::PoolBuilder;
use crate::error::PoolError;
use crate::raw::RawPool;

/// A pool of reusable worker threads that all run the same task function.
///
/// Where [`TaskPool`][crate::TaskPool] accepts a fresh closure per
/// submission, a `FuncPool` fixes the function at construction and
/// [`invoke()`][Self::invoke] submits only the argument. This avoids boxing a
/// closure per task when every task does the same work.
///
/// Admission, backpressure, idle reclamation, and panic containment behave
/// exactly as for [`TaskPool`][crate::TaskPool].
///
/// # Example
///
/// ```
/// use std::sync::mpsc;
///
/// use task_pool::FuncPool;
///
/// let (done, results) = mpsc::channel();
/// let pool = FuncPool::new(4, move |n: u64| {
///     done.send(n * 2).unwrap();
/// })?;
///
/// for n in 1..=3 {
///     pool.invoke(n)?;
/// }
///
/// let mut doubled: Vec<u64> = results.iter().take(3).collect();
/// doubled.sort_unstable();
/// assert_eq!(doubled, vec![2, 4, 6]);
///
/// pool.release();
/// # Ok::<(), task_pool::PoolError>(())
/// ```
pub struct FuncPool<T: Send + 'static> {
    raw: Arc<RawPool<T>>,
}

impl<T: Send + 'static> FuncPool<T> {
    /// Creates a function pool with the given worker-count ceiling, default
    /// configuration, and task function. A capacity of zero leaves the pool
    /// unbounded.
    ///
    /// # Errors
    ///
    /// The default configuration is always valid; the fallible signature
    /// exists for parity with [`builder()`][Self::builder] construction.
    pub fn new<F>(capacity: usize, task_fn: F) -> Result<Self, PoolError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::builder().capacity(capacity).build_func(task_fn)
    }

    /// Starts building a function pool with customized configuration; finish
    /// with [`PoolBuilder::build_func()`].
    ///
    /// # Example
    ///
    /// ```
    /// use task_pool::FuncPool;
    ///
    /// let pool = FuncPool::<u32>::builder()
    ///     .capacity(2)
    ///     .nonblocking(true)
    ///     .build_func(|n: u32| {
    ///         let _ = n;
    ///     })?;
    /// # pool.release();
    /// # Ok::<(), task_pool::PoolError>(())
    /// ```
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn from_raw(raw: Arc<RawPool<T>>) -> Self {
        Self { raw }
    }

    /// Submits one argument for asynchronous execution by the pool's task
    /// function.
    ///
    /// Returns as soon as a worker has accepted the argument; never waits for
    /// execution. May block the calling thread only when the pool is
    /// saturated and blocking admission is enabled.
    ///
    /// # Errors
    ///
    /// * [`PoolError::PoolClosed`] - the pool was released and not rebooted.
    /// * [`PoolError::PoolOverload`] - the pool is saturated and configured
    ///   to reject rather than block, or the blocking-submitter cap was hit.
    pub fn invoke(&self, arg: T) -> Result<(), PoolError> {
        self.raw.submit(arg)
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
    pub fn tune(&self, capacity: usize) {
        self.raw.tune(capacity);
    }

    /// Whether the pool has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.raw.is_closed()
    }

    /// Closes the pool: idle workers retire immediately, blocked submitters
    /// fail with [`PoolError::PoolClosed`], and every subsequent invoke is
    /// refused. Arguments already dispatched run to completion.
    pub fn release(&self) {
        self.raw.release();
    }

    /// Reopens a released pool, restarting the scavenger. Admission resumes
    /// with zero live workers.
    pub fn reboot(&self) {
        self.raw.reboot();
    }
}

impl<T: Send + 'static> std::fmt::Debug for FuncPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncPool").field("raw", &self.raw).finish()
    }
}

impl<T: Send + 'static> Drop for FuncPool<T> {
    fn drop(&mut self) {
        self.raw.release();
    }
}
