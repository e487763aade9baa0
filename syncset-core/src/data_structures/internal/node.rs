use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use syncset_epoch::Reclaimable;

use super::marked_ptr::AtomicMarkedPtr;
use crate::sync::RawLock;

/// Element type of every set.
pub type Key = i32;

/// Value of the head sentinel. Never stored by `add`.
pub const HEAD_KEY: Key = Key::MIN;

/// Value of the tail sentinel. Never stored by `add`.
pub const TAIL_KEY: Key = Key::MAX;

// Written into reclaimed lock-free nodes in debug builds. Shares the head
// value, so a non-head node carrying it has been handed back by the reclaimer.
pub(crate) const POISON: Key = HEAD_KEY;

/// Whether `value` can live in a set (i.e. is not a sentinel value).
#[inline]
pub fn is_storable(value: Key) -> bool {
    value != HEAD_KEY && value != TAIL_KEY
}

// =============================================================================
// PlainNode: links guarded by one set-wide lock
// =============================================================================

pub(crate) struct PlainNode {
    pub(crate) value: Key,
    pub(crate) next: *mut PlainNode,
}

impl PlainNode {
    pub(crate) fn alloc(value: Key, next: *mut PlainNode) -> *mut PlainNode {
        Box::into_raw(Box::new(PlainNode { value, next }))
    }
}

// =============================================================================
// LockNode: per-node lock and logical-removal flag
// =============================================================================

pub(crate) struct LockNode<L> {
    value: Key,
    next: AtomicPtr<LockNode<L>>,
    removed: AtomicBool,
    pub(crate) lock: L,
}

impl<L: RawLock> LockNode<L> {
    pub(crate) fn alloc(value: Key, next: *mut LockNode<L>) -> *mut LockNode<L> {
        Box::into_raw(Box::new(LockNode {
            value,
            next: AtomicPtr::new(next),
            removed: AtomicBool::new(false),
            lock: L::default(),
        }))
    }

    #[inline]
    pub(crate) fn value(&self) -> Key {
        self.value
    }

    /// Load next pointer (Acquire ordering)
    #[inline]
    pub(crate) fn next(&self) -> *mut LockNode<L> {
        self.next.load(Ordering::Acquire)
    }

    /// Store next pointer (Release ordering)
    #[inline]
    pub(crate) fn set_next(&self, next: *mut LockNode<L>) {
        self.next.store(next, Ordering::Release)
    }

    #[inline]
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Logical deletion. Must be called with the node's lock held.
    #[inline]
    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::SeqCst)
    }
}

// =============================================================================
// ArcNode: reference-counted links, freed by the last holder
// =============================================================================

pub(crate) struct ArcNode<L> {
    value: Key,
    next: ArcSwapOption<ArcNode<L>>,
    removed: AtomicBool,
    pub(crate) lock: L,
}

impl<L: RawLock> ArcNode<L> {
    pub(crate) fn new(value: Key, next: Option<Arc<ArcNode<L>>>) -> Arc<ArcNode<L>> {
        Arc::new(ArcNode {
            value,
            next: ArcSwapOption::new(next),
            removed: AtomicBool::new(false),
            lock: L::default(),
        })
    }

    #[inline]
    pub(crate) fn value(&self) -> Key {
        self.value
    }

    /// Successor, `None` only past the tail sentinel.
    #[inline]
    pub(crate) fn next(&self) -> Option<Arc<ArcNode<L>>> {
        self.next.load_full()
    }

    #[inline]
    pub(crate) fn set_next(&self, next: Option<Arc<ArcNode<L>>>) {
        self.next.store(next)
    }

    /// Detaches the successor and hands it to the caller.
    #[inline]
    pub(crate) fn take_next(&self) -> Option<Arc<ArcNode<L>>> {
        self.next.swap(None)
    }

    #[inline]
    pub(crate) fn links_to(&self, node: &Arc<ArcNode<L>>) -> bool {
        match &*self.next.load() {
            Some(next) => Arc::ptr_eq(next, node),
            None => false,
        }
    }

    #[inline]
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Logical deletion. Must be called with the node's lock held.
    #[inline]
    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::SeqCst)
    }
}

// =============================================================================
// LockFreeNode: marked next link, reusable through the epoch reclaimer
// =============================================================================

/// Node of the lock-free sets.
///
/// The value is atomic because the epoch reclaimer recycles nodes: a reused
/// node gets a new value, and debug builds poison nodes before reuse.
///
pub struct LockFreeNode {
    value: AtomicI32,
    next: AtomicMarkedPtr<LockFreeNode>,
    retired_epoch: AtomicU64,
}

// Retired epoch of a node parked by the deferred reclaimer, which never
// stamps real epochs.
const PARKED: u64 = u64::MAX;

// The deletion mark lives in bit 0 of the address.
const _: () = assert!(std::mem::align_of::<LockFreeNode>() >= 2);

impl LockFreeNode {
    pub(crate) fn new(value: Key) -> Self {
        LockFreeNode {
            value: AtomicI32::new(value),
            next: AtomicMarkedPtr::new(ptr::null_mut(), false),
            retired_epoch: AtomicU64::new(0),
        }
    }

    pub(crate) fn alloc(value: Key) -> *mut LockFreeNode {
        Box::into_raw(Box::new(LockFreeNode::new(value)))
    }

    /// Prepare a recycled node for a new insertion.
    pub(crate) fn reset(&self, value: Key) {
        self.value.store(value, Ordering::Relaxed);
        self.next.store(ptr::null_mut(), false);
    }

    #[inline]
    pub(crate) fn value(&self) -> Key {
        self.value.load(Ordering::Relaxed)
    }

    /// Value of a node reached by traversal (never the head sentinel).
    #[inline]
    pub(crate) fn observed_value(&self) -> Key {
        let value = self.value();
        debug_assert_ne!(
            value, POISON,
            "traversal reached a node that was already reclaimed"
        );
        value
    }

    #[inline]
    pub(crate) fn next(&self) -> &AtomicMarkedPtr<LockFreeNode> {
        &self.next
    }

    /// Flags the node as parked. Returns false if it already was.
    #[inline]
    pub(crate) fn park(&self) -> bool {
        self.retired_epoch.swap(PARKED, Ordering::AcqRel) != PARKED
    }
}

impl Reclaimable for LockFreeNode {
    fn retired_epoch(&self) -> u64 {
        self.retired_epoch.load(Ordering::Relaxed)
    }

    fn set_retired_epoch(&self, epoch: u64) {
        self.retired_epoch.store(epoch, Ordering::Relaxed)
    }

    fn poison(&self) {
        self.value.store(POISON, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ParkingLock;

    #[test]
    fn test_sentinel_values_not_storable() {
        assert!(!is_storable(HEAD_KEY));
        assert!(!is_storable(TAIL_KEY));
        assert!(is_storable(0));
        assert!(is_storable(HEAD_KEY + 1));
        assert!(is_storable(TAIL_KEY - 1));
    }

    #[test]
    fn test_lock_node_removal_flag() {
        let node = LockNode::<ParkingLock>::alloc(5, ptr::null_mut());
        unsafe {
            assert_eq!((*node).value(), 5);
            assert!(!(*node).is_removed());
            (*node).mark_removed();
            assert!((*node).is_removed());
            drop(Box::from_raw(node));
        }
    }

    #[test]
    fn test_lock_free_node_reset_after_poison() {
        let node = LockFreeNode::new(9);
        node.next().attempt_mark(ptr::null_mut(), true);
        node.poison();
        assert_eq!(node.value(), POISON);

        node.reset(11);
        assert_eq!(node.observed_value(), 11);
        assert!(!node.next().is_marked());
    }

    #[test]
    fn test_park_only_once() {
        let node = LockFreeNode::new(2);
        assert!(node.park());
        assert!(!node.park());
    }
}
