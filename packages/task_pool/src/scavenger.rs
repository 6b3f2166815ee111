//! The periodic reclaimer for idle workers.
//!
//! One scavenger thread runs per open pool, ticking at the idle-expiry
//! interval. Each tick strips every worker that has been idle longer than the
//! expiry window off the old end of the idle store and sends it the retire
//! sentinel. The thread exits when the pool closes or drops;
//! [`reboot()`][crate::TaskPool::reboot] starts a fresh one.

use std::sync::Weak;
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::ERR_THREAD_SPAWN;
use crate::raw::RawPool;

pub(crate) fn start<T: Send + 'static>(pool: Weak<RawPool<T>>, interval: Duration) {
    thread::Builder::new()
        .name("task-pool-scavenger".to_string())
        .spawn(move || run(&pool, interval))
        .expect(ERR_THREAD_SPAWN);
}

fn run<T: Send + 'static>(pool: &Weak<RawPool<T>>, interval: Duration) {
    loop {
        thread::sleep(interval);

        // Holding only a weak reference means the scavenger never keeps a
        // dropped pool alive.
        let Some(engine) = pool.upgrade() else {
            return;
        };
        if engine.is_closed() {
            return;
        }

        let expired = match Instant::now().checked_sub(engine.idle_expiry()) {
            Some(cutoff) => engine.evict_expired(cutoff),
            // The process is younger than the expiry window; nothing can
            // have expired yet.
            None => Vec::new(),
        };

        // Sentinels go out after the pool lock is released so a slow worker
        // cannot stall admission.
        let evicted = expired.len();
        for worker in expired {
            worker.retire();
        }

        if evicted > 0 {
            tracing::debug!(evicted, "scavenger evicted expired idle workers");
        }

        // If eviction drained the pool entirely, submitters blocked on a
        // recycled worker would otherwise wait forever. Broadcast rather than
        // signal: each woken waiter re-validates, so none can be missed.
        if engine.running() == 0 {
            engine.wake_all();
        }
    }
}
