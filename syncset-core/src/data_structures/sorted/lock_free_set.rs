use log::{debug, trace};

use crate::config::SetConfig;
use crate::data_structures::OrderedSet;
use crate::data_structures::internal::{HEAD_KEY, Key, LockFreeNode, TAIL_KEY, is_storable};
use crate::error::SetError;
use crate::reclaim::{CrossbeamReclaimer, DeferredReclaimer, EpochReclaimer, Reclaim};
use crate::worker::{Worker, WorkerRegistry};

type NodePtr = *mut LockFreeNode;

/// Lock-free set without reclamation during use.
pub type LeakySet = LockFreeSet<DeferredReclaimer>;

/// Lock-free set with per-worker epoch reclamation and node reuse.
pub type EbrSet = LockFreeSet<EpochReclaimer<LockFreeNode>>;

/// Lock-free set reclaimed through crossbeam-epoch.
pub type CrossbeamEbrSet = LockFreeSet<CrossbeamReclaimer>;

///
/// Harris-style lock-free sorted list, parameterized by its reclamation scheme.
///
// =============================================================================
// MARKED LINKS
// =============================================================================
//
// The mark bit on node.next means the NODE holding the link is logically
// deleted:
//
//   prev ──────► curr ──╳───► succ       curr is deleted, still reachable
//
// Every node unlinked from the list is handed to the reclaimer exactly once,
// by the thread whose unlink CAS succeeded.
//
// =============================================================================
// OPERATIONS
// =============================================================================
//
// find(v):     walk from HEAD; on a marked curr, CAS prev.next (curr -> succ)
//              and retire curr. A failed CAS restarts from HEAD.
//
// add(v):      find; present -> false. Otherwise new.next = curr and
//              CAS prev.next (curr, 0) -> (new, 0). Retry on failure with the
//              same candidate node.
//
// remove(v):   find; absent -> false. Mark curr.next (succ, 0) -> (succ, 1):
//              this is the linearization point. Then try to unlink once;
//              if that fails, a later find finishes the job.
//
// contains(v): walk by value only, no CAS. Present iff curr.value == v and
//              curr is unmarked.
//
// Every public operation runs inside a reclaimer pin (StartOp/EndOp).
//
// =============================================================================
pub struct LockFreeSet<R: Reclaim = DeferredReclaimer> {
    head: NodePtr,
    tail: NodePtr,
    reclaimer: R,
    registry: WorkerRegistry,
}

// Safety: links are only changed by CAS, and nodes are freed through the
// reclaimer, which only does so once no pinned worker can reach them.
unsafe impl<R: Reclaim> Send for LockFreeSet<R> {}
unsafe impl<R: Reclaim> Sync for LockFreeSet<R> {}

impl<R: Reclaim> LockFreeSet<R> {
    pub fn new() -> Self {
        Self::with_config(&SetConfig::default())
    }

    pub fn with_config(config: &SetConfig) -> Self {
        let tail = LockFreeNode::alloc(TAIL_KEY);
        let head = LockFreeNode::alloc(HEAD_KEY);
        unsafe { (*head).next().store(tail, false) };

        LockFreeSet {
            head,
            tail,
            reclaimer: R::with_config(config),
            registry: WorkerRegistry::new(config.max_workers),
        }
    }

    pub fn reclaimer(&self) -> &R {
        &self.reclaimer
    }

    ///
    /// Returns `(prev, curr)` with `prev.value < value <= curr.value`, both
    /// unmarked when observed. Unlinks (and retires) marked nodes on the way.
    ///
    /// # Safety
    /// `pin` must be the caller's live pin of this set's reclaimer.
    ///
    unsafe fn find(&self, pin: &R::Pin<'_>, value: Key) -> (NodePtr, NodePtr) {
        'retry: loop {
            unsafe {
                let mut prev = self.head;
                let mut curr = (*prev).next().ptr();

                loop {
                    let (mut succ, mut marked) = (*curr).next().load().split();

                    while marked {
                        if !(*prev).next().compare_and_set(curr, succ, false, false) {
                            trace!("find({}) lost an unlink race, restarting", value);
                            continue 'retry;
                        }
                        self.reclaimer.retire(pin, curr);
                        curr = succ;
                        (succ, marked) = (*curr).next().load().split();
                    }

                    if (*curr).observed_value() >= value {
                        return (prev, curr);
                    }
                    prev = curr;
                    curr = succ;
                }
            }
        }
    }
}

impl<R: Reclaim> Default for LockFreeSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reclaim> OrderedSet for LockFreeSet<R> {
    fn name(&self) -> &'static str {
        R::STRATEGY_NAME
    }

    fn register(&self) -> Result<Worker<'_>, SetError> {
        self.registry.register()
    }

    fn add(&self, worker: &Worker<'_>, value: Key) -> bool {
        let slot = self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let pin = unsafe { self.reclaimer.pin(slot) };
        // Allocated before `find`, while this worker holds no node references:
        // the epoch reclaimer skips the owner slot when certifying a reuse.
        // A duplicate add therefore pays for one alloc and discard.
        let node = self.reclaimer.alloc(&pin, value);

        loop {
            unsafe {
                let (prev, curr) = self.find(&pin, value);
                if (*curr).observed_value() == value {
                    self.reclaimer.discard(&pin, node);
                    return false;
                }

                (*node).next().store(curr, false);
                if (*prev).next().compare_and_set(curr, node, false, false) {
                    return true;
                }
            }
            trace!("add({}) lost a link race, retrying", value);
        }
    }

    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool {
        let slot = self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let pin = unsafe { self.reclaimer.pin(slot) };

        loop {
            unsafe {
                let (prev, curr) = self.find(&pin, value);
                if (*curr).observed_value() != value {
                    return false;
                }

                let succ = (*curr).next().ptr();
                if !(*curr).next().attempt_mark(succ, true) {
                    trace!("remove({}) lost a mark race, retrying", value);
                    continue;
                }

                if (*prev).next().compare_and_set(curr, succ, false, false) {
                    self.reclaimer.retire(&pin, curr);
                }
                return true;
            }
        }
    }

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool {
        let slot = self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let _pin = unsafe { self.reclaimer.pin(slot) };
        unsafe {
            let mut curr = (*self.head).next().ptr();
            while (*curr).observed_value() < value {
                curr = (*curr).next().ptr();
            }
            (*curr).observed_value() == value && !(*curr).next().is_marked()
        }
    }

    fn clear(&mut self) {
        let mut freed = 0usize;
        unsafe {
            let mut curr = (*self.head).next().ptr();
            while curr != self.tail {
                let next = (*curr).next().ptr();
                drop(Box::from_raw(curr));
                curr = next;
                freed += 1;
            }
            (*self.head).next().store(self.tail, false);
        }
        self.reclaimer.recycle();

        debug!("{} set cleared, {} nodes freed", self.name(), freed);
    }

    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key> {
        let slot = self.registry.slot_of(worker);

        let _pin = unsafe { self.reclaimer.pin(slot) };
        let mut values = Vec::new();
        unsafe {
            let mut curr = (*self.head).next().ptr();
            while curr != self.tail && values.len() < limit {
                let (next, marked) = (*curr).next().load().split();
                if !marked {
                    values.push((*curr).observed_value());
                }
                curr = next;
            }
        }
        values
    }
}

impl<R: Reclaim> Drop for LockFreeSet<R> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            drop(Box::from_raw(self.tail));
            drop(Box::from_raw(self.head));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(LeakySet::new().name(), "lock-free");
        assert_eq!(EbrSet::new().name(), "lock-free-ebr");
        assert_eq!(CrossbeamEbrSet::new().name(), "lock-free-crossbeam");
    }

    #[test]
    fn test_marked_node_is_unlinked_by_find() {
        let set = LeakySet::new();
        let worker = set.register().unwrap();
        for value in [1, 2, 3] {
            assert!(set.add(&worker, value));
        }

        // Logically delete 2 without unlinking it.
        unsafe {
            let pin = set.reclaimer.pin(0);
            let (_, curr) = set.find(&pin, 2);
            let succ = (*curr).next().ptr();
            assert!((*curr).next().attempt_mark(succ, true));
        }
        assert!(!set.contains(&worker, 2));
        assert_eq!(set.reclaimer().pending(), 0);

        // The next traversal past 2 unlinks and retires it.
        assert!(set.contains(&worker, 3));
        assert!(set.add(&worker, 4));
        assert_eq!(set.reclaimer().pending(), 1);
        assert_eq!(set.snapshot(&worker, 10), vec![1, 3, 4]);
    }

    #[test]
    fn test_removed_nodes_are_reused_with_ebr() {
        let set = EbrSet::with_config(&SetConfig::default().with_max_workers(2));
        let worker = set.register().unwrap();

        for round in 0..50 {
            assert!(set.add(&worker, round));
            assert!(set.remove(&worker, round));
        }
        assert!(set.reclaimer().reused_count() >= 49);
        assert!(set.snapshot(&worker, 10).is_empty());
    }

    #[test]
    fn test_duplicate_add_discards_candidate() {
        let set = LeakySet::new();
        let worker = set.register().unwrap();

        assert!(set.add(&worker, 7));
        assert!(!set.add(&worker, 7));
        assert_eq!(set.reclaimer().pending(), 0);
        assert_eq!(set.snapshot(&worker, 10), vec![7]);
    }

    #[test]
    fn test_duplicate_add_cycles_one_parked_node_with_ebr() {
        let set = EbrSet::with_config(&SetConfig::default().with_max_workers(2));
        let worker = set.register().unwrap();

        assert!(set.add(&worker, 7));
        assert!(set.add(&worker, 1));
        assert!(set.remove(&worker, 1));
        assert_eq!(set.reclaimer().reused_count(), 0);

        // Each duplicate takes the parked node as its candidate and parks it
        // again; nothing else is allocated or reused.
        for _ in 0..10 {
            assert!(!set.add(&worker, 7));
        }
        assert_eq!(set.reclaimer().reused_count(), 10);
        assert_eq!(set.snapshot(&worker, 10), vec![7]);
    }
}
