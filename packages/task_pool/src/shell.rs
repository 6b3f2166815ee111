use std::sync::Mutex;

use crate::constants::ERR_POISONED_LOCK;

/// A capped free-list that recycles values across uses instead of allocating
/// fresh ones.
///
/// The pool uses this to carry [`WorkerShell`] records across retire/spawn
/// cycles, so a worker identity (and its preformatted thread name) does not
/// have to be rebuilt every time the scavenger retires a worker that demand
/// later brings back.
pub(crate) struct FreeList<T> {
    items: Mutex<Vec<T>>,

    /// Values released beyond this count are simply dropped.
    limit: usize,
}

impl<T> FreeList<T> {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            limit,
        }
    }

    /// Takes a recycled value if one is available, otherwise creates one.
    pub(crate) fn acquire(&self, create: impl FnOnce() -> T) -> T {
        let recycled = self.items.lock().expect(ERR_POISONED_LOCK).pop();
        recycled.unwrap_or_else(create)
    }

    /// Returns a value to the free-list for later reuse.
    pub(crate) fn release(&self, value: T) {
        let mut items = self.items.lock().expect(ERR_POISONED_LOCK);

        if items.len() < self.limit {
            items.push(value);
        }
    }
}

impl<T> std::fmt::Debug for FreeList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeList")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// The reusable identity of one worker thread.
///
/// The shell outlives any individual worker: when a worker retires, its shell
/// goes back to the pool's free-list and the next spawn picks it up again.
#[derive(Debug)]
pub(crate) struct WorkerShell {
    pub(crate) id: u64,

    /// Preformatted once so respawns do not re-render it.
    pub(crate) thread_name: String,
}

impl WorkerShell {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            thread_name: format!("task-pool-worker-{id}"),
        }
    }
}
