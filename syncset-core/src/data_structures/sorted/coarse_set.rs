use std::ptr;

use log::debug;

use crate::config::SetConfig;
use crate::data_structures::OrderedSet;
use crate::data_structures::internal::{HEAD_KEY, Key, PlainNode, TAIL_KEY, is_storable};
use crate::error::SetError;
use crate::sync::{ParkingLock, RawLock};
use crate::worker::{Worker, WorkerRegistry};

type NodePtr = *mut PlainNode;

///
/// Sorted list behind a single lock.
///
/// Every operation holds the set lock for its whole traversal and mutation,
/// so all operations are serialized. Baseline for the other strategies.
///
pub struct CoarseSet<L: RawLock = ParkingLock> {
    head: NodePtr,
    lock: L,
    registry: WorkerRegistry,
}

// Safety: nodes are only read or written with `lock` held, or through
// `&mut self`.
unsafe impl<L: RawLock> Send for CoarseSet<L> {}
unsafe impl<L: RawLock> Sync for CoarseSet<L> {}

impl CoarseSet<ParkingLock> {
    pub fn new() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> CoarseSet<L> {
    pub fn with_config(config: &SetConfig) -> Self {
        let tail = PlainNode::alloc(TAIL_KEY, ptr::null_mut());
        CoarseSet {
            head: PlainNode::alloc(HEAD_KEY, tail),
            lock: L::default(),
            registry: WorkerRegistry::new(config.max_workers),
        }
    }

    /// First pair with `prev.value < value <= curr.value`.
    ///
    /// # Safety
    /// The set lock must be held.
    ///
    unsafe fn locate(&self, value: Key) -> (NodePtr, NodePtr) {
        unsafe {
            let mut prev = self.head;
            let mut curr = (*prev).next;
            while (*curr).value < value {
                prev = curr;
                curr = (*curr).next;
            }
            (prev, curr)
        }
    }
}

impl<L: RawLock> Default for CoarseSet<L> {
    fn default() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> OrderedSet for CoarseSet<L> {
    fn name(&self) -> &'static str {
        "coarse"
    }

    fn register(&self) -> Result<Worker<'_>, SetError> {
        self.registry.register()
    }

    fn add(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let _guard = self.lock.lock();
        unsafe {
            let (prev, curr) = self.locate(value);
            if (*curr).value == value {
                return false;
            }
            (*prev).next = PlainNode::alloc(value, curr);
        }
        true
    }

    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let _guard = self.lock.lock();
        unsafe {
            let (prev, curr) = self.locate(value);
            if (*curr).value != value {
                return false;
            }
            (*prev).next = (*curr).next;
            drop(Box::from_raw(curr));
        }
        true
    }

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let _guard = self.lock.lock();
        unsafe {
            let (_, curr) = self.locate(value);
            (*curr).value == value
        }
    }

    fn clear(&mut self) {
        let mut freed = 0usize;
        unsafe {
            let mut curr = (*self.head).next;
            while (*curr).value != TAIL_KEY {
                let next = (*curr).next;
                drop(Box::from_raw(curr));
                curr = next;
                freed += 1;
            }
            (*self.head).next = curr;
        }
        debug!("coarse set cleared, {} nodes freed", freed);
    }

    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key> {
        self.registry.slot_of(worker);

        let _guard = self.lock.lock();
        let mut values = Vec::new();
        unsafe {
            let mut curr = (*self.head).next;
            while (*curr).value != TAIL_KEY && values.len() < limit {
                values.push((*curr).value);
                curr = (*curr).next;
            }
        }
        values
    }
}

impl<L: RawLock> Drop for CoarseSet<L> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            let tail = (*self.head).next;
            drop(Box::from_raw(tail));
            drop(Box::from_raw(self.head));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SpinLock;

    #[test]
    fn test_sorted_after_unordered_inserts() {
        let set = CoarseSet::new();
        let worker = set.register().unwrap();

        for value in [5, 1, 9, 3, 7] {
            assert!(set.add(&worker, value));
        }
        assert_eq!(set.snapshot(&worker, 10), vec![1, 3, 5, 7, 9]);
        assert!(set.remove(&worker, 5));
        assert_eq!(set.snapshot(&worker, 10), vec![1, 3, 7, 9]);
    }

    #[test]
    fn test_spin_lock_variant() {
        let set: CoarseSet<SpinLock> = CoarseSet::with_config(&SetConfig::default());
        let worker = set.register().unwrap();

        assert!(set.add(&worker, 2));
        assert!(set.contains(&worker, 2));
        assert!(!set.contains(&worker, 3));
        assert!(set.remove(&worker, 2));
    }

    #[test]
    fn test_clear_keeps_set_usable() {
        let mut set = CoarseSet::new();
        {
            let worker = set.register().unwrap();
            for value in 0..100 {
                set.add(&worker, value);
            }
        }
        set.clear();

        let worker = set.register().unwrap();
        assert!(set.snapshot(&worker, 10).is_empty());
        assert!(set.add(&worker, 42));
        assert_eq!(set.preview(&worker), "42");
    }
}
