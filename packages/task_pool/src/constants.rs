//! Constants used throughout the package.

use std::time::Duration;

/// Eviction threshold (and scavenger tick interval) applied when a pool is
/// built without an explicit idle expiry.
pub(crate) const DEFAULT_IDLE_EXPIRY: Duration = Duration::from_secs(10);

/// Encodes "no capacity ceiling" in the engine's atomic capacity cell.
pub(crate) const UNBOUNDED_CAPACITY: i64 = -1;

/// How many retired worker shells the free-list will hold for reuse.
pub(crate) const SHELL_CACHE_CAPACITY: usize = 64;

pub(crate) const ERR_POISONED_LOCK: &str =
    "encountered poisoned lock - safe execution is no longer possible";

/// A worker's inbox can only disconnect once its thread has exited, and a
/// worker never exits while the pool still holds a record for it.
pub(crate) const ERR_WORKER_INBOX: &str =
    "worker inbox disconnected while the pool still held its record - pool bookkeeping is corrupted";

pub(crate) const ERR_THREAD_SPAWN: &str =
    "failed to spawn a pool thread - the process is out of thread resources";
