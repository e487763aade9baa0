//! Per-worker context.
//!
//! A set owns a [`WorkerRegistry`] with a fixed number of slots. Threads
//! take a slot by registering and pass the resulting [`Worker`] to every
//! operation. Strategies that keep per-worker state (the epoch reclaimer)
//! index it by the worker's slot.

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::utils::CachePadded;

use crate::error::SetError;

pub struct WorkerRegistry {
    slots: Box<[CachePadded<AtomicBool>]>,
}

impl WorkerRegistry {
    pub fn new(capacity: usize) -> Self {
        WorkerRegistry {
            slots: (0..capacity)
                .map(|_| CachePadded::new(AtomicBool::new(false)))
                .collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of workers currently holding a slot.
    pub fn active(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire))
            .count()
    }

    /// Claims the first free slot.
    ///
    pub fn register(&self) -> Result<Worker<'_>, SetError> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(Worker {
                    registry: self,
                    index,
                    _unsync: PhantomData,
                });
            }
        }

        Err(SetError::NoFreeWorkerSlot {
            capacity: self.capacity(),
        })
    }

    pub fn owns(&self, worker: &Worker<'_>) -> bool {
        ptr::eq(worker.registry, self)
    }

    /// Slot of a worker registered with this registry.
    ///
    /// # Panics
    /// If the worker was registered with another registry.
    ///
    pub fn slot_of(&self, worker: &Worker<'_>) -> usize {
        assert!(
            self.owns(worker),
            "worker {} was registered with a different set",
            worker.index
        );
        worker.index
    }
}

/// Exclusive ownership of one registry slot.
///
/// Not `Sync`: a slot is used by a single thread at a time. Dropping the
/// worker returns the slot to the registry.
///
pub struct Worker<'r> {
    registry: &'r WorkerRegistry,
    index: usize,
    _unsync: PhantomData<Cell<()>>,
}

impl Worker<'_> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Debug for Worker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Worker({})", self.index)
    }
}

impl Drop for Worker<'_> {
    fn drop(&mut self) {
        self.registry.slots[self.index].store(false, Ordering::Release);
    }
}
