use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_IDLE_EXPIRY, UNBOUNDED_CAPACITY};
use crate::error::PoolError;
use crate::func_pool::FuncPool;
use crate::logger::{PoolLogger, TracingLogger};
use crate::pool::{Task, TaskPool};
use crate::raw::RawPool;

/// A callback invoked with the payload recovered from a panicking task.
///
/// Installing one via [`PoolBuilder::panic_handler()`] replaces the default
/// log-and-continue behavior. The worker that contained the panic survives
/// either way.
pub type PanicHandler = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

/// Validated construction parameters shared by both pool frontends.
pub(crate) struct Options {
    /// Workers idle longer than this are evicted; also the scavenger's tick
    /// interval.
    pub(crate) idle_expiry: Duration,

    pub(crate) preallocate: bool,

    /// 0 = unbounded blocking queue.
    pub(crate) max_blocking_submitters: usize,

    pub(crate) nonblocking: bool,

    pub(crate) panic_handler: Option<PanicHandler>,

    pub(crate) logger: Arc<dyn PoolLogger>,
}

impl Options {
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            idle_expiry: Duration::from_millis(10),
            preallocate: false,
            max_blocking_submitters: 0,
            nonblocking: false,
            panic_handler: None,
            logger: Arc::new(TracingLogger),
        }
    }
}

/// Builder for creating a [`TaskPool`] or a [`FuncPool`].
///
/// You only need the builder to customize behavior beyond the defaults;
/// [`TaskPool::new()`] and [`FuncPool::new()`] cover the common case.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use task_pool::TaskPool;
///
/// let pool = TaskPool::builder()
///     .capacity(8)
///     .idle_expiry(Duration::from_secs(30))
///     .nonblocking(true)
///     .build()?;
/// # pool.release();
/// # Ok::<(), task_pool::PoolError>(())
/// ```
#[must_use]
pub struct PoolBuilder {
    capacity: usize,
    idle_expiry: Option<Duration>,
    preallocate: bool,
    max_blocking_submitters: usize,
    nonblocking: bool,
    panic_handler: Option<PanicHandler>,
    logger: Option<Arc<dyn PoolLogger>>,
}

impl std::fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("capacity", &self.capacity)
            .field("idle_expiry", &self.idle_expiry)
            .field("preallocate", &self.preallocate)
            .field("max_blocking_submitters", &self.max_blocking_submitters)
            .field("nonblocking", &self.nonblocking)
            .field("has_panic_handler", &self.panic_handler.is_some())
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}

impl PoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            capacity: 0,
            idle_expiry: None,
            preallocate: false,
            max_blocking_submitters: 0,
            nonblocking: false,
            panic_handler: None,
            logger: None,
        }
    }

    /// Sets the hard ceiling on concurrently live workers.
    ///
    /// A capacity of zero (the default) leaves the pool unbounded, capped
    /// only by what the operating system can schedule.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets how long a worker may sit idle before the scavenger retires it.
    /// The scavenger also ticks at this interval.
    ///
    /// Defaults to 10 seconds when not set. An explicit zero duration fails
    /// the build with [`PoolError::InvalidExpiry`].
    pub fn idle_expiry(mut self, expiry: Duration) -> Self {
        self.idle_expiry = Some(expiry);
        self
    }

    /// Preallocates the idle store as a fixed-capacity ring buffer instead of
    /// a growable stack, avoiding reallocation churn for latency-sensitive
    /// fixed-size pools.
    ///
    /// Requires a bounded, nonzero [`capacity()`][Self::capacity]; the build
    /// fails with [`PoolError::InvalidPreallocCapacity`] otherwise. A
    /// preallocated pool cannot be retuned.
    pub fn preallocate(mut self, preallocate: bool) -> Self {
        self.preallocate = preallocate;
        self
    }

    /// Caps how many submitters may block waiting for admission at once;
    /// submitters beyond the cap fail immediately with
    /// [`PoolError::PoolOverload`].
    ///
    /// Zero (the default) means the blocking queue is unbounded.
    pub fn max_blocking_submitters(mut self, limit: usize) -> Self {
        self.max_blocking_submitters = limit;
        self
    }

    /// Disables blocking admission entirely: submitting to a saturated pool
    /// always fails immediately with [`PoolError::PoolOverload`].
    pub fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    /// Installs a callback for panics recovered from tasks, replacing the
    /// default log-and-continue behavior.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use task_pool::TaskPool;
    ///
    /// let pool = TaskPool::builder()
    ///     .panic_handler(Arc::new(|payload| {
    ///         eprintln!("a task panicked: {payload:?}");
    ///     }))
    ///     .build()?;
    /// # pool.release();
    /// # Ok::<(), task_pool::PoolError>(())
    /// ```
    pub fn panic_handler(mut self, handler: PanicHandler) -> Self {
        self.panic_handler = Some(handler);
        self
    }

    /// Routes panic reports to the given sink instead of the default
    /// [`tracing`]-backed one.
    pub fn logger(mut self, logger: Arc<dyn PoolLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds a [`TaskPool`] that runs arbitrary submitted closures.
    ///
    /// # Errors
    ///
    /// Fails fast, with no worker spawned, when the configuration is invalid;
    /// see [`PoolError::InvalidExpiry`] and
    /// [`PoolError::InvalidPreallocCapacity`].
    pub fn build(self) -> Result<TaskPool, PoolError> {
        let (capacity, options) = self.finish()?;
        let raw = RawPool::new(capacity, Box::new(|task: Task| task()), options);
        Ok(TaskPool::from_raw(raw))
    }

    /// Builds a [`FuncPool`] where every invocation runs `task_fn` on the
    /// submitted argument.
    ///
    /// # Errors
    ///
    /// Fails fast, with no worker spawned, when the configuration is invalid;
    /// see [`PoolError::InvalidExpiry`] and
    /// [`PoolError::InvalidPreallocCapacity`].
    pub fn build_func<T, F>(self, task_fn: F) -> Result<FuncPool<T>, PoolError>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let (capacity, options) = self.finish()?;
        let raw = RawPool::new(capacity, Box::new(task_fn), options);
        Ok(FuncPool::from_raw(raw))
    }

    fn finish(self) -> Result<(i64, Options), PoolError> {
        let capacity = match self.capacity {
            0 => UNBOUNDED_CAPACITY,
            bounded => i64::try_from(bounded).unwrap_or(i64::MAX),
        };

        let idle_expiry = match self.idle_expiry {
            Some(expiry) if expiry.is_zero() => return Err(PoolError::InvalidExpiry),
            Some(expiry) => expiry,
            None => DEFAULT_IDLE_EXPIRY,
        };

        if self.preallocate && capacity == UNBOUNDED_CAPACITY {
            return Err(PoolError::InvalidPreallocCapacity);
        }

        let options = Options {
            idle_expiry,
            preallocate: self.preallocate,
            max_blocking_submitters: self.max_blocking_submitters,
            nonblocking: self.nonblocking,
            panic_handler: self.panic_handler,
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
        };

        Ok((capacity, options))
    }
}
