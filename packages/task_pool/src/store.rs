use std::time::Instant;

use crate::worker::Worker;

/// The store rejected an insert because every slot is occupied.
///
/// Only the preallocated ring variant can report this; the growable stack
/// always accepts. A rejected revert makes the worker retire instead.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct StoreFull;

/// The collection of currently-idle workers.
///
/// Entries are kept sorted ascending by idle timestamp: inserts always append
/// the most recently idled worker, detaches always remove it again (the
/// warmest worker is reused first), and the scavenger strips the oldest
/// entries off the front.
///
/// Two interchangeable layouts exist. The growable stack is the default; the
/// fixed ring avoids reallocation churn for pools with a known capacity and
/// is selected by the `preallocate` build option.
pub(crate) enum IdleStore<T> {
    Stack(IdleStack<T>),
    Ring(IdleRing<T>),
}

impl<T> IdleStore<T> {
    pub(crate) fn growable() -> Self {
        Self::Stack(IdleStack::new())
    }

    /// # Panics
    ///
    /// Panics if `capacity` is zero. The builder validates this before any
    /// store is constructed.
    pub(crate) fn preallocated(capacity: usize) -> Self {
        Self::Ring(IdleRing::new(capacity))
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Stack(stack) => stack.len(),
            Self::Ring(ring) => ring.len(),
        }
    }

    pub(crate) fn insert(&mut self, worker: Worker<T>) -> Result<(), StoreFull> {
        match self {
            Self::Stack(stack) => stack.insert(worker),
            Self::Ring(ring) => ring.insert(worker),
        }
    }

    /// Removes and returns the most recently idled worker.
    pub(crate) fn detach(&mut self) -> Option<Worker<T>> {
        match self {
            Self::Stack(stack) => stack.detach(),
            Self::Ring(ring) => ring.detach(),
        }
    }

    /// Removes and returns every worker that went idle at or before `cutoff`.
    pub(crate) fn retrieve_expired(&mut self, cutoff: Instant) -> Vec<Worker<T>> {
        match self {
            Self::Stack(stack) => stack.retrieve_expired(cutoff),
            Self::Ring(ring) => ring.retrieve_expired(cutoff),
        }
    }

    /// Drains the store wholesale, returning the entries in idle order so the
    /// caller can notify them outside the pool lock.
    pub(crate) fn reset(&mut self) -> Vec<Worker<T>> {
        match self {
            Self::Stack(stack) => stack.reset(),
            Self::Ring(ring) => ring.reset(),
        }
    }
}

impl<T> std::fmt::Debug for IdleStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (layout, len) = match self {
            Self::Stack(stack) => ("stack", stack.len()),
            Self::Ring(ring) => ("ring", ring.len()),
        };

        f.debug_struct("IdleStore")
            .field("layout", &layout)
            .field("len", &len)
            .finish()
    }
}

/// Growable idle store: a plain vector used as a stack.
pub(crate) struct IdleStack<T> {
    items: Vec<Worker<T>>,
}

impl<T> IdleStack<T> {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn insert(&mut self, worker: Worker<T>) -> Result<(), StoreFull> {
        self.items.push(worker);
        Ok(())
    }

    fn detach(&mut self) -> Option<Worker<T>> {
        self.items.pop()
    }

    fn retrieve_expired(&mut self, cutoff: Instant) -> Vec<Worker<T>> {
        // Sorted ascending by idle timestamp, so a binary search finds the
        // first entry young enough to keep.
        let split = self
            .items
            .partition_point(|worker| worker.idle_since <= cutoff);

        self.items.drain(..split).collect()
    }

    fn reset(&mut self) -> Vec<Worker<T>> {
        self.items.drain(..).collect()
    }
}

/// Fixed-capacity idle store: a preallocated ring buffer.
///
/// `head` is the logical index of the oldest entry; inserts go to
/// `head + len`, detaches take from `head + len - 1`. Indices wrap.
pub(crate) struct IdleRing<T> {
    slots: Vec<Option<Worker<T>>>,
    head: usize,
    len: usize,
}

impl<T> IdleRing<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "IdleRing requires a nonzero capacity");

        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn slot_index(&self, offset: usize) -> usize {
        (self.head + offset) % self.slots.len()
    }

    fn insert(&mut self, worker: Worker<T>) -> Result<(), StoreFull> {
        if self.len == self.slots.len() {
            return Err(StoreFull);
        }

        let index = self.slot_index(self.len);
        self.slots[index] = Some(worker);
        self.len += 1;
        Ok(())
    }

    fn detach(&mut self) -> Option<Worker<T>> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        let index = self.slot_index(self.len);
        self.slots[index].take()
    }

    fn retrieve_expired(&mut self, cutoff: Instant) -> Vec<Worker<T>> {
        let mut expired = Vec::new();

        while self.len > 0 {
            let index = self.head;

            let is_expired = self.slots[index]
                .as_ref()
                .is_some_and(|worker| worker.idle_since <= cutoff);
            if !is_expired {
                break;
            }

            expired.extend(self.slots[index].take());
            self.head = self.slot_index(1);
            self.len -= 1;
        }

        expired
    }

    fn reset(&mut self) -> Vec<Worker<T>> {
        let mut drained = Vec::with_capacity(self.len);

        while self.len > 0 {
            drained.extend(self.slots[self.head].take());
            self.head = self.slot_index(1);
            self.len -= 1;
        }

        drained
    }
}
