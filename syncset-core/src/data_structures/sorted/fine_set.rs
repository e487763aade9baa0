use std::ptr;

use log::debug;

use crate::config::SetConfig;
use crate::data_structures::OrderedSet;
use crate::data_structures::internal::{HEAD_KEY, Key, LockNode, TAIL_KEY, is_storable};
use crate::error::SetError;
use crate::sync::{LockGuard, ParkingLock, RawLock};
use crate::worker::{Worker, WorkerRegistry};

type NodePtr<L> = *mut LockNode<L>;

///
/// Sorted list with hand-over-hand (lock coupling) traversal.
///
// =============================================================================
// LOCK COUPLING
// =============================================================================
//
// A traversal always holds the lock of the node it stands on before it
// takes the next one, and releases the older lock right after:
//
//   step 1:  [HEAD]══►[ 10 ]───►[ 20 ]───►[TAIL]      ══ locked pair
//   step 2:   HEAD ───►[ 10 ]══►[ 20 ]───►[TAIL]
//
// No thread can overtake another, so a node whose predecessor and itself are
// both locked cannot be reached by anyone else. Removal unlinks `curr`
// under both locks and frees it once the locks are released: the only
// thread that could be waiting for `curr` would have to hold `prev`.
//
// At most two node locks are held by a worker at any time.
//
// =============================================================================
pub struct FineSet<L: RawLock = ParkingLock> {
    head: NodePtr<L>,
    registry: WorkerRegistry,
}

// Safety: links are only written under the locks of both adjacent nodes,
// and read under the lock of the node holding them.
unsafe impl<L: RawLock> Send for FineSet<L> {}
unsafe impl<L: RawLock> Sync for FineSet<L> {}

/// A locked `(prev, curr)` pair with `prev.value < value <= curr.value`.
struct Window<'a, L: RawLock> {
    prev: NodePtr<L>,
    curr: NodePtr<L>,
    prev_guard: LockGuard<'a, L>,
    curr_guard: LockGuard<'a, L>,
}

impl FineSet<ParkingLock> {
    pub fn new() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> FineSet<L> {
    pub fn with_config(config: &SetConfig) -> Self {
        let tail = LockNode::alloc(TAIL_KEY, ptr::null_mut());
        FineSet {
            head: LockNode::alloc(HEAD_KEY, tail),
            registry: WorkerRegistry::new(config.max_workers),
        }
    }

    fn locate(&self, value: Key) -> Window<'_, L> {
        unsafe {
            let mut prev = self.head;
            let mut prev_guard = (*prev).lock.lock();
            let mut curr = (*prev).next();
            let mut curr_guard = (*curr).lock.lock();

            while (*curr).value() < value {
                // Releases the old `prev`; `curr` stays locked.
                prev_guard = curr_guard;
                prev = curr;
                curr = (*curr).next();
                curr_guard = (*curr).lock.lock();
            }

            Window {
                prev,
                curr,
                prev_guard,
                curr_guard,
            }
        }
    }
}

impl<L: RawLock> Default for FineSet<L> {
    fn default() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> OrderedSet for FineSet<L> {
    fn name(&self) -> &'static str {
        "fine"
    }

    fn register(&self) -> Result<Worker<'_>, SetError> {
        self.registry.register()
    }

    fn add(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let window = self.locate(value);
        unsafe {
            if (*window.curr).value() == value {
                return false;
            }
            (*window.prev).set_next(LockNode::alloc(value, window.curr));
        }
        true
    }

    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let Window {
            prev,
            curr,
            prev_guard,
            curr_guard,
        } = self.locate(value);

        unsafe {
            if (*curr).value() != value {
                return false;
            }
            (*curr).mark_removed();
            (*prev).set_next((*curr).next());

            drop(curr_guard);
            drop(prev_guard);
            drop(Box::from_raw(curr));
        }
        true
    }

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let window = self.locate(value);
        unsafe { (*window.curr).value() == value }
    }

    fn clear(&mut self) {
        let mut freed = 0usize;
        unsafe {
            let mut curr = (*self.head).next();
            while (*curr).value() != TAIL_KEY {
                let next = (*curr).next();
                drop(Box::from_raw(curr));
                curr = next;
                freed += 1;
            }
            (*self.head).set_next(curr);
        }
        debug!("fine set cleared, {} nodes freed", freed);
    }

    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key> {
        self.registry.slot_of(worker);

        let mut values = Vec::new();
        unsafe {
            let mut guard = (*self.head).lock.lock();
            let mut curr = (*self.head).next();
            while (*curr).value() != TAIL_KEY && values.len() < limit {
                let next_guard = (*curr).lock.lock();
                guard = next_guard;
                values.push((*curr).value());
                curr = (*curr).next();
            }
            drop(guard);
        }
        values
    }
}

impl<L: RawLock> Drop for FineSet<L> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw((*self.head).next()));
            drop(Box::from_raw(self.head));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SpinLock;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_locks_released_after_every_operation() {
        let set = FineSet::new();
        let worker = set.register().unwrap();

        assert!(set.add(&worker, 1));
        assert!(!set.add(&worker, 1));
        assert!(!set.remove(&worker, 2));
        assert!(set.contains(&worker, 1));
        assert!(set.remove(&worker, 1));

        unsafe {
            assert!((*set.head).lock.try_acquire());
            (*set.head).lock.release();
            let tail = (*set.head).next();
            assert!((*tail).lock.try_acquire());
            (*tail).lock.release();
        }
    }

    #[test]
    fn test_disjoint_ranges_with_spin_lock() {
        let set: FineSet<SpinLock> = FineSet::with_config(&SetConfig::default());
        let barrier = Barrier::new(4);

        thread::scope(|scope| {
            for t in 0..4 {
                let set = &set;
                let barrier = &barrier;
                scope.spawn(move || {
                    let worker = set.register().unwrap();
                    barrier.wait();
                    for i in 0..200 {
                        assert!(set.add(&worker, i * 4 + t));
                    }
                    for i in (0..200).step_by(2) {
                        assert!(set.remove(&worker, i * 4 + t));
                    }
                });
            }
        });

        let worker = set.register().unwrap();
        let values = set.snapshot(&worker, usize::MAX);
        assert_eq!(values.len(), 400);
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
