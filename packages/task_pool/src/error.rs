use thiserror::Error;

/// Errors that can occur when building a pool or admitting a task into one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been released and admits no further tasks until it is
    /// rebooted via [`reboot()`][crate::TaskPool::reboot].
    #[error("the pool has been released and is not accepting tasks")]
    PoolClosed,

    /// Every worker is busy and the pool refused to admit the task, either
    /// because the pool is nonblocking or because the blocking-submitter
    /// limit was reached. The condition is transient; callers may retry.
    #[error("the pool is saturated and cannot admit more tasks")]
    PoolOverload,

    /// An idle-expiry duration of zero was configured. Leave the expiry unset
    /// to use the default instead.
    #[error("the idle expiry duration must be greater than zero")]
    InvalidExpiry,

    /// Preallocation of the idle store was requested for a pool without a
    /// bounded, nonzero capacity.
    #[error("preallocation requires a bounded, nonzero pool capacity")]
    InvalidPreallocCapacity,
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`PoolError`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, PoolError>;
