use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

use log::{debug, trace};

use crate::config::SetConfig;
use crate::data_structures::OrderedSet;
use crate::data_structures::internal::{ArcNode, HEAD_KEY, Key, TAIL_KEY, is_storable, validate_shared};
use crate::error::SetError;
use crate::sync::{ParkingLock, RawLock};
use crate::worker::{Worker, WorkerRegistry};

type NodeRef<L> = Arc<ArcNode<L>>;

///
/// Lazy set whose nodes are reference counted.
///
/// Same protocol as [`LazySet`](super::LazySet): unlocked scan, lock
/// `prev` then `curr`, validate, then logical and physical removal. Links are
/// `ArcSwapOption`s, so an unlinked node is freed by whichever holder drops
/// the last reference, with no retired list.
///
pub struct ArcLazySet<L: RawLock = ParkingLock> {
    head: NodeRef<L>,
    tail: NodeRef<L>,
    registry: WorkerRegistry,
}

impl ArcLazySet<ParkingLock> {
    pub fn new() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> ArcLazySet<L> {
    pub fn with_config(config: &SetConfig) -> Self {
        let tail = ArcNode::new(TAIL_KEY, None);
        ArcLazySet {
            head: ArcNode::new(HEAD_KEY, Some(Arc::clone(&tail))),
            tail,
            registry: WorkerRegistry::new(config.max_workers),
        }
    }

    // Unlocked scan. Both nodes stay alive for as long as the pair is held.
    fn locate(&self, value: Key) -> (NodeRef<L>, NodeRef<L>) {
        let mut prev = Arc::clone(&self.head);
        let mut curr = self.successor(&prev);

        while curr.value() < value {
            let next = self.successor(&curr);
            prev = std::mem::replace(&mut curr, next);
        }
        (prev, curr)
    }

    // Only the tail has no successor, and the tail ends every scan.
    fn successor(&self, node: &NodeRef<L>) -> NodeRef<L> {
        node.next().unwrap_or_else(|| Arc::clone(&self.tail))
    }
}

impl<L: RawLock> Default for ArcLazySet<L> {
    fn default() -> Self {
        Self::with_config(&SetConfig::default())
    }
}

impl<L: RawLock> OrderedSet for ArcLazySet<L> {
    fn name(&self) -> &'static str {
        "lazy-arc"
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
            let _prev_guard = prev.lock.lock();
            let _curr_guard = curr.lock.lock();

            if !validate_shared(&prev, &curr) {
                trace!("lazy-arc add({}) failed validation, retrying", value);
                continue;
            }
            if curr.value() == value {
                return false;
            }
            prev.set_next(Some(ArcNode::new(value, Some(Arc::clone(&curr)))));
            return true;
        }
    }

    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        loop {
            let (prev, curr) = self.locate(value);
            let _prev_guard = prev.lock.lock();
            let _curr_guard = curr.lock.lock();

            if !validate_shared(&prev, &curr) {
                trace!("lazy-arc remove({}) failed validation, retrying", value);
                continue;
            }
            if curr.value() != value {
                return false;
            }

            curr.mark_removed();
            fence(Ordering::SeqCst);
            prev.set_next(curr.next());
            return true;
        }
    }

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool {
        self.registry.slot_of(worker);
        if !is_storable(value) {
            return false;
        }

        let (_, curr) = self.locate(value);
        curr.value() == value && !curr.is_removed()
    }

    fn clear(&mut self) {
        let mut freed = 0usize;

        // Unlink one node at a time so that dropping a long chain does not
        // recurse through every `Arc`.
        let mut curr = self.head.take_next();
        while let Some(node) = curr {
            if Arc::ptr_eq(&node, &self.tail) {
                break;
            }
            curr = node.take_next();
            freed += 1;
        }
        self.head.set_next(Some(Arc::clone(&self.tail)));

        debug!("lazy-arc set cleared, {} nodes released", freed);
    }

    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key> {
        self.registry.slot_of(worker);

        let mut values = Vec::new();
        let mut curr = self.successor(&self.head);
        while !Arc::ptr_eq(&curr, &self.tail) && values.len() < limit {
            if !curr.is_removed() {
                values.push(curr.value());
            }
            curr = self.successor(&curr);
        }
        values
    }
}

impl<L: RawLock> Drop for ArcLazySet<L> {
    fn drop(&mut self) {
        self.clear();
    }
}
