use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::Instant;

use crate::constants::{ERR_THREAD_SPAWN, ERR_WORKER_INBOX};
use crate::raw::RawPool;
use crate::shell::WorkerShell;

/// One message on a worker's single-slot inbox.
pub(crate) enum Message<T> {
    /// A payload for the worker to execute.
    Run(T),

    /// The sentinel instructing the worker to retire instead of executing
    /// anything further.
    Retire,
}

/// The pool-side record of one live worker.
///
/// The worker thread itself owns the receiving half of the inbox; this record
/// carries the sending half and moves between the idle store and whichever
/// submitter detached it. At most one record per worker exists outside the
/// worker thread at any time, so dispatching through it can never contend.
pub(crate) struct Worker<T> {
    pub(crate) id: u64,

    pub(crate) inbox: SyncSender<Message<T>>,

    /// When the worker last went idle. Set on revert; meaningless while the
    /// record is outside the idle store.
    pub(crate) idle_since: Instant,
}

impl<T> Worker<T> {
    /// Hands a payload to the worker. Returns immediately; execution is
    /// asynchronous.
    pub(crate) fn dispatch(self, payload: T) {
        // The inbox holds one slot and the worker is known to be waiting on
        // it, so this send cannot block.
        self.inbox.send(Message::Run(payload)).expect(ERR_WORKER_INBOX);
    }

    /// Sends the worker its retire sentinel.
    pub(crate) fn retire(self) {
        self.inbox.send(Message::Retire).expect(ERR_WORKER_INBOX);
    }
}

impl<T> std::fmt::Debug for Worker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("idle_since", &self.idle_since)
            .finish_non_exhaustive()
    }
}

/// Starts one worker thread and returns its pool-side record, ready for an
/// immediate dispatch.
///
/// The caller must already have reserved a running slot; spawning itself does
/// not touch the running counter.
pub(crate) fn spawn<T: Send + 'static>(pool: &Arc<RawPool<T>>) -> Worker<T> {
    let shell = pool.acquire_shell();
    let (inbox, mailbox) = mpsc::sync_channel::<Message<T>>(1);

    let record = Worker {
        id: shell.id,
        inbox: inbox.clone(),
        idle_since: Instant::now(),
    };

    let thread_pool = Arc::clone(pool);
    thread::Builder::new()
        .name(shell.thread_name.clone())
        .spawn(move || worker_loop(&thread_pool, shell, &inbox, &mailbox))
        .expect(ERR_THREAD_SPAWN);

    tracing::debug!(worker_id = record.id, "spawned worker");
    record
}

/// The per-worker execution loop: wait for a message, run it, revert to the
/// idle store; repeat until retired.
fn worker_loop<T: Send + 'static>(
    pool: &Arc<RawPool<T>>,
    shell: WorkerShell,
    own_inbox: &SyncSender<Message<T>>,
    mailbox: &Receiver<Message<T>>,
) {
    let worker_id = shell.id;

    // Retire-time bookkeeping runs on every exit path, even if a diagnostics
    // hook itself panics: release the running slot, recycle the shell, and
    // wake one submitter in case somebody was waiting for this slot.
    let cleanup_pool = Arc::clone(pool);
    let _cleanup = scopeguard::guard(shell, move |shell| {
        cleanup_pool.dec_running();
        cleanup_pool.release_shell(shell);
        cleanup_pool.wake_one();
        tracing::debug!(worker_id, "worker retired");
    });

    while let Ok(message) = mailbox.recv() {
        let payload = match message {
            Message::Run(payload) => payload,
            Message::Retire => break,
        };

        // A panicking task must not take the worker down with it; contain it
        // and report through the configured channel.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pool.execute(payload)));
        if let Err(panic_payload) = outcome {
            pool.report_panic(worker_id, panic_payload);
        }

        let record = Worker {
            id: worker_id,
            inbox: own_inbox.clone(),
            idle_since: Instant::now(),
        };
        if !pool.revert_worker(record) {
            break;
        }
    }
}
