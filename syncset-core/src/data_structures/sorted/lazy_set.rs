use std::ptr;
use std::sync::atomic::{Ordering, fence};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::config::SetConfig;
use crate::data_structures::OrderedSet;
use crate::data_structures::internal::{HEAD_KEY, Key, LockNode, TAIL_KEY, is_storable, validate};
use crate::error::SetError;
use crate::sync::{ParkingLock, RawLock};
use crate::worker::{Worker, WorkerRegistry};

type NodePtr<L> = *mut LockNode<L>;

///
/// Sorted list with optimistic traversal and lazy (two-phase) removal.
///
// =============================================================================
// LAZY SYNCHRONIZATION
// =============================================================================
//
// 1. Scan without locks to the candidate pair (prev, curr)
// 2. Lock prev, then curr
// 3. Validate: !prev.removed && !curr.removed && prev.next == curr
//    On failure, release both and restart from HEAD
//
// Remove (with both locks held):
//
//   prev ───► curr ───► next          curr.removed = true     (logical)
//                                     fence(SeqCst)
//   prev ─────────────► next          prev.next = curr.next   (physical)
//
// Readers never lock. A reader may stand on an unlinked node, so unlinked
// nodes are parked in `retired` and only freed by `clear` or drop.
//
// =============================================================================
pub struct LazySet<L: RawLock = ParkingLock> {
    head: NodePtr<L>,
    retired: Mutex<Vec<NodePtr<L>>>,
    registry: WorkerRegistry,
}

// Safety: links are written with both adjacent nodes locked and read
// atomically; unlinked nodes are not freed while `&self` is shared.
unsafe impl<L: RawLock> Send for LazySet<L> {}
unsafe impl<L: RawLock> Sync for LazySet<L> {}

impl LazySet<ParkingLock> {
    pub fn new() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> LazySet<L> {
    pub fn with_config(config: &SetConfig) -> Self {
        let tail = LockNode::alloc(TAIL_KEY, ptr::null_mut());
        LazySet {
            head: LockNode::alloc(HEAD_KEY, tail),
            retired: Mutex::new(Vec::new()),
            registry: WorkerRegistry::new(config.max_workers),
        }
    }

    /// Nodes unlinked since the last `clear`.
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    // Unlocked scan. The pair may be stale by the time it is used.
    fn locate(&self, value: Key) -> (NodePtr<L>, NodePtr<L>) {
        unsafe {
            let mut prev = self.head;
            let mut curr = (*prev).next();
            while (*curr).value() < value {
                prev = curr;
                curr = (*curr).next();
            }
            (prev, curr)
        }
    }
}

impl<L: RawLock> Default for LazySet<L> {
    fn default() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> OrderedSet for LazySet<L> {
    fn name(&self) -> &'static str {
        "lazy"
    }

    fn register(&self) -> Result<Worker<'_>, SetError> {
        self.registry.register()
    }

    fn add(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        loop {
            let (prev, curr) = self.locate(value);
            unsafe {
                let _prev_guard = (*prev).lock.lock();
                let _curr_guard = (*curr).lock.lock();

                if !validate(prev, curr) {
                    trace!("lazy add({}) failed validation, retrying", value);
                    continue;
                }
                if (*curr).value() == value {
                    return false;
                }
                (*prev).set_next(LockNode::alloc(value, curr));
                return true;
            }
        }
    }

    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        loop {
            let (prev, curr) = self.locate(value);
            unsafe {
                let prev_guard = (*prev).lock.lock();
                let curr_guard = (*curr).lock.lock();

                if !validate(prev, curr) {
                    trace!("lazy remove({}) failed validation, retrying", value);
                    continue;
                }
                if (*curr).value() != value {
                    return false;
                }

                (*curr).mark_removed();
                fence(Ordering::SeqCst);
                (*prev).set_next((*curr).next());

                drop(curr_guard);
                drop(prev_guard);
            }
            self.retired.lock().push(curr);
            return true;
        }
    }

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let (_, curr) = self.locate(value);
        unsafe { (*curr).value() == value && !(*curr).is_removed() }
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

        let retired = self.retired.get_mut();
        let parked = retired.len();
        for node in retired.drain(..) {
            unsafe { drop(Box::from_raw(node)) };
        }

        debug!(
            "lazy set cleared, {} nodes freed, {} retired nodes freed",
            freed, parked
        );
    }

    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key> {
        self.registry.slot_of(worker);

        let mut values = Vec::new();
        unsafe {
            let mut curr = (*self.head).next();
            while (*curr).value() != TAIL_KEY && values.len() < limit {
                if !(*curr).is_removed() {
                    values.push((*curr).value());
                }
                curr = (*curr).next();
            }
        }
        values
    }
}

impl<L: RawLock> Drop for LazySet<L> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw((*self.head).next()));
            drop(Box::from_raw(self.head));
        }
    }
}
