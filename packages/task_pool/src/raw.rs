use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::builder::Options;
use crate::constants::{ERR_POISONED_LOCK, SHELL_CACHE_CAPACITY, UNBOUNDED_CAPACITY};
use crate::error::{PoolError, Result};
use crate::scavenger;
use crate::shell::{FreeList, WorkerShell};
use crate::store::IdleStore;
use crate::worker::{self, Worker};

/// State that must only change under the pool lock.
struct SyncState<T> {
    idle: IdleStore<T>,

    /// Submitters currently parked in [`RawPool::retrieve_worker()`].
    blocked: usize,
}

/// The pool engine shared by [`TaskPool`][crate::TaskPool] and
/// [`FuncPool`][crate::FuncPool]: capacity and running counters, the idle
/// store, the blocking-admission condition variable, and the spawn/revert/
/// evict decisions.
///
/// Generic over the inbox payload. The closure-pool frontend uses boxed
/// tasks; the function-pool frontend uses the caller's argument type and a
/// fixed executor.
///
/// Critical sections are O(1) counter and pointer work; one standard mutex
/// plus one condition variable (used exclusively by blocked submitters)
/// protect all shared mutable state.
pub(crate) struct RawPool<T> {
    /// `-1` means unbounded; otherwise the hard ceiling on live workers.
    capacity: AtomicI64,

    /// Number of currently live workers.
    running: AtomicI64,

    closed: AtomicBool,

    sync: Mutex<SyncState<T>>,

    /// Waited on only by submitters blocked for admission.
    cond: Condvar,

    /// What a worker does with one payload.
    executor: Box<dyn Fn(T) + Send + Sync>,

    options: Options,

    /// Recycles worker shells across retire/spawn cycles.
    shells: FreeList<WorkerShell>,

    next_worker_id: AtomicU64,
}

impl<T: Send + 'static> RawPool<T> {
    /// Builds the engine and starts its scavenger.
    ///
    /// `capacity` uses the internal encoding: `-1` for unbounded, otherwise a
    /// positive ceiling. The builder has already validated the combination
    /// with `preallocate`.
    pub(crate) fn new(
        capacity: i64,
        executor: Box<dyn Fn(T) + Send + Sync>,
        options: Options,
    ) -> Arc<Self> {
        let idle = if options.preallocate {
            IdleStore::preallocated(usize::try_from(capacity).unwrap_or(0))
        } else {
            IdleStore::growable()
        };

        let pool = Arc::new(Self {
            capacity: AtomicI64::new(capacity),
            running: AtomicI64::new(0),
            closed: AtomicBool::new(false),
            sync: Mutex::new(SyncState { idle, blocked: 0 }),
            cond: Condvar::new(),
            executor,
            options,
            shells: FreeList::new(SHELL_CACHE_CAPACITY),
            next_worker_id: AtomicU64::new(0),
        });

        scavenger::start(Arc::downgrade(&pool), pool.options.idle_expiry);

        pool
    }

    /// Admits one payload: find or spawn a worker, hand the payload over,
    /// return without waiting for execution.
    pub(crate) fn submit(self: &Arc<Self>, payload: T) -> Result<()> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let worker = self.retrieve_worker()?;
        worker.dispatch(payload);
        Ok(())
    }

    /// The admission algorithm: reuse the most recently idled worker, spawn
    /// under capacity, otherwise reject or block according to configuration.
    fn retrieve_worker(self: &Arc<Self>) -> Result<Worker<T>> {
        let mut sync = self.sync.lock().expect(ERR_POISONED_LOCK);

        if let Some(worker) = sync.idle.detach() {
            drop(sync);
            return Ok(worker);
        }

        if self.try_reserve_slot() {
            drop(sync);
            return Ok(worker::spawn(self));
        }

        if self.options.nonblocking {
            return Err(PoolError::PoolOverload);
        }

        loop {
            if self.options.max_blocking_submitters != 0
                && sync.blocked >= self.options.max_blocking_submitters
            {
                return Err(PoolError::PoolOverload);
            }

            sync.blocked += 1;
            sync = self.cond.wait(sync).expect(ERR_POISONED_LOCK);
            sync.blocked -= 1;

            if self.is_closed() {
                return Err(PoolError::PoolClosed);
            }

            if self.running() == 0 {
                // The scavenger reclaimed every worker while we waited; the
                // idle store cannot help, so spawn directly. Racing waiters
                // serialize on the reservation and the losers go around.
                if self.try_reserve_slot() {
                    drop(sync);
                    return Ok(worker::spawn(self));
                }
                continue;
            }

            if let Some(worker) = sync.idle.detach() {
                drop(sync);
                return Ok(worker);
            }

            if self.try_reserve_slot() {
                drop(sync);
                return Ok(worker::spawn(self));
            }
        }
    }

    /// Reserves one running slot if the capacity allows another worker.
    ///
    /// Must be called with the pool lock held: the check and the increment
    /// cannot race another reservation then, and concurrent decrements only
    /// widen the budget. This keeps `running() <= capacity` observable at
    /// every instant.
    fn try_reserve_slot(&self) -> bool {
        let capacity = self.capacity.load(Ordering::Acquire);

        if capacity != UNBOUNDED_CAPACITY && self.running.load(Ordering::Acquire) >= capacity {
            return false;
        }

        self.running.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Takes a finished worker back into the idle store.
    ///
    /// Returns `false` when the worker must retire instead: the pool closed,
    /// capacity shrank below the running count, or the preallocated store is
    /// full.
    pub(crate) fn revert_worker(&self, mut worker: Worker<T>) -> bool {
        if self.is_closed() || self.over_capacity() {
            return false;
        }

        worker.idle_since = Instant::now();

        let mut sync = self.sync.lock().expect(ERR_POISONED_LOCK);

        // Re-checked under the lock so release() cannot strand the record in
        // a store it has already drained.
        if self.is_closed() {
            return false;
        }

        if sync.idle.insert(worker).is_err() {
            return false;
        }

        // Exactly one slot became available, so exactly one waiter is woken.
        self.cond.notify_one();
        true
    }

    fn over_capacity(&self) -> bool {
        let capacity = self.capacity.load(Ordering::Acquire);
        capacity != UNBOUNDED_CAPACITY && self.running.load(Ordering::Acquire) > capacity
    }

    /// Closes the pool: drains the idle store, retires every idle worker, and
    /// wakes all blocked submitters so they fail with
    /// [`PoolError::PoolClosed`] instead of hanging.
    pub(crate) fn release(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let drained = self.sync.lock().expect(ERR_POISONED_LOCK).idle.reset();

        // Sentinels go out after the lock is dropped; a slow worker must not
        // stall the submitters we are about to wake.
        for worker in drained {
            worker.retire();
        }

        self.cond.notify_all();
        tracing::debug!("pool released");
    }

    /// Reopens a released pool and restarts its scavenger.
    pub(crate) fn reboot(self: &Arc<Self>) {
        if self
            .closed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            scavenger::start(Arc::downgrade(self), self.options.idle_expiry);
            tracing::debug!("pool rebooted");
        }
    }

    /// Changes the capacity ceiling. No-op for unbounded or preallocated
    /// pools, for a zero argument, and for workers already running.
    pub(crate) fn tune(&self, capacity: usize) {
        let current = self.capacity.load(Ordering::Acquire);
        let requested = i64::try_from(capacity).unwrap_or(i64::MAX);

        if current == UNBOUNDED_CAPACITY || capacity == 0 || requested == current || self.options.preallocate
        {
            return;
        }

        self.capacity.store(requested, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn running(&self) -> usize {
        usize::try_from(self.running.load(Ordering::Acquire)).unwrap_or(0)
    }

    /// `None` means the pool is unbounded.
    pub(crate) fn capacity(&self) -> Option<usize> {
        usize::try_from(self.capacity.load(Ordering::Acquire)).ok()
    }

    /// Remaining admission slots; `None` means the pool is unbounded.
    pub(crate) fn free(&self) -> Option<usize> {
        self.capacity()
            .map(|capacity| capacity.saturating_sub(self.running()))
    }

    // Entry points for worker threads and the scavenger.

    pub(crate) fn execute(&self, payload: T) {
        (self.executor)(payload);
    }

    pub(crate) fn dec_running(&self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn acquire_shell(&self) -> WorkerShell {
        self.shells
            .acquire(|| WorkerShell::new(self.next_worker_id.fetch_add(1, Ordering::Relaxed)))
    }

    pub(crate) fn release_shell(&self, shell: WorkerShell) {
        self.shells.release(shell);
    }

    /// Wakes one blocked submitter. The lock is taken and dropped first so a
    /// submitter between its admission check and its park cannot miss the
    /// notification.
    pub(crate) fn wake_one(&self) {
        drop(self.lock_sync());
        self.cond.notify_one();
    }

    /// Wakes every blocked submitter; each re-validates under the lock.
    pub(crate) fn wake_all(&self) {
        drop(self.lock_sync());
        self.cond.notify_all();
    }

    /// Removes and returns every worker idle since `cutoff` or earlier.
    pub(crate) fn evict_expired(&self, cutoff: Instant) -> Vec<Worker<T>> {
        self.lock_sync().idle.retrieve_expired(cutoff)
    }

    pub(crate) fn idle_expiry(&self) -> std::time::Duration {
        self.options.idle_expiry
    }

    /// Reports a contained task panic through the configured panic handler,
    /// or the logger when no handler is set.
    pub(crate) fn report_panic(&self, worker_id: u64, payload: Box<dyn Any + Send>) {
        if let Some(handler) = &self.options.panic_handler {
            handler(payload);
            return;
        }

        let message = panic_message(payload.as_ref());
        let backtrace = std::backtrace::Backtrace::force_capture();
        self.options.logger.log(format_args!(
            "worker {worker_id}: task panicked: {message}\n{backtrace}"
        ));
    }

    fn lock_sync(&self) -> MutexGuard<'_, SyncState<T>> {
        self.sync.lock().expect(ERR_POISONED_LOCK)
    }
}

impl<T> std::fmt::Debug for RawPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPool")
            .field("capacity", &self.capacity.load(Ordering::Acquire))
            .field("running", &self.running.load(Ordering::Acquire))
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Best-effort extraction of the human-readable part of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    fn engine(capacity: i64) -> Arc<RawPool<()>> {
        RawPool::new(capacity, Box::new(|()| {}), Options::for_tests())
    }

    fn reserve(pool: &RawPool<()>) -> bool {
        // The lock requirement exists only to serialize reservations; these
        // tests are single-threaded.
        let _guard = pool.lock_sync();
        pool.try_reserve_slot()
    }

    #[test]
    fn reservation_stops_at_capacity() {
        let pool = engine(2);

        assert!(reserve(&pool));
        assert!(reserve(&pool));
        assert!(!reserve(&pool));
        assert_eq!(pool.running(), 2);
        assert_eq!(pool.free(), Some(0));

        pool.dec_running();
        assert!(reserve(&pool));
    }

    #[test]
    fn unbounded_reservation_never_fails() {
        let pool = engine(UNBOUNDED_CAPACITY);

        for _ in 0..100 {
            assert!(reserve(&pool));
        }

        assert_eq!(pool.capacity(), None);
        assert_eq!(pool.free(), None);
        assert_eq!(pool.running(), 100);
    }

    #[test]
    fn tune_adjusts_bounded_pools_only() {
        let bounded = engine(2);
        bounded.tune(5);
        assert_eq!(bounded.capacity(), Some(5));

        bounded.tune(0);
        assert_eq!(bounded.capacity(), Some(5));

        let unbounded = engine(UNBOUNDED_CAPACITY);
        unbounded.tune(5);
        assert_eq!(unbounded.capacity(), None);
    }

    #[test]
    fn tune_is_noop_for_preallocated_pools() {
        let mut options = Options::for_tests();
        options.preallocate = true;
        let pool: Arc<RawPool<()>> = RawPool::new(3, Box::new(|()| {}), options);

        pool.tune(10);

        assert_eq!(pool.capacity(), Some(3));
    }

    #[test]
    fn release_is_idempotent_and_terminal() {
        let pool = engine(2);

        assert!(!pool.is_closed());
        pool.release();
        assert!(pool.is_closed());
        pool.release();
        assert!(pool.is_closed());

        pool.reboot();
        assert!(!pool.is_closed());
    }

    #[test]
    fn over_capacity_detects_shrink() {
        let pool = engine(2);

        assert!(reserve(&pool));
        assert!(reserve(&pool));
        assert!(!pool.over_capacity());

        pool.tune(1);
        assert!(pool.over_capacity());
    }

    #[test]
    fn panic_message_extracts_common_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(literal.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new("kaboom".to_string());
        assert_eq!(panic_message(owned.as_ref()), "kaboom");

        let opaque: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(opaque.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn engine_survives_scavenger_ticks_while_empty() {
        let pool = engine(1);

        // Interval is short in test options; give the scavenger a tick with
        // nothing to do.
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(pool.running(), 0);
        assert!(!pool.is_closed());
    }
}
