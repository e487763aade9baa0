//! Deferred reclaimer: no reclamation while the set is in use.
//!
//! Unlinked nodes are parked and only freed when the set is cleared or
//! dropped.

use std::ptr::NonNull;

use crossbeam::queue::SegQueue;
use log::debug;

use super::Reclaim;
use crate::config::SetConfig;
use crate::data_structures::{Key, LockFreeNode};

/// Parks every retired node until `recycle` (clear) or drop.
///
/// Memory grows with the number of successful removals, which is the
/// intended trade-off for the plain lock-free set: no bookkeeping on the
/// hot path, and no node is ever freed under a concurrent reader.
///
/// # Thread Safety
///
/// Retired nodes are pushed onto a `SegQueue`, so `retire` never blocks and
/// the set stays lock-free. Each parked node is flagged with an atomic swap,
/// and debug builds assert that no node is retired twice.
///
pub struct DeferredReclaimer {
    deferred: SegQueue<DeferredNode>,
}

struct DeferredNode {
    ptr: NonNull<LockFreeNode>,
}

// Safety: the node is unreachable once deferred; only the pointer moves
// between threads.
unsafe impl Send for DeferredNode {}

impl DeferredReclaimer {
    pub fn new() -> Self {
        DeferredReclaimer {
            deferred: SegQueue::new(),
        }
    }

    /// Number of retired nodes waiting to be freed.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }
}

impl Default for DeferredReclaimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredReclaimer {
    fn drop(&mut self) {
        self.recycle();
    }
}

impl Reclaim for DeferredReclaimer {
    /// Protection comes from never freeing during operations.
    type Pin<'a> = ();

    const STRATEGY_NAME: &'static str = "lock-free";

    fn with_config(_config: &SetConfig) -> Self {
        Self::new()
    }

    unsafe fn pin(&self, _slot: usize) -> Self::Pin<'_> {}

    fn alloc(&self, _pin: &(), value: Key) -> *mut LockFreeNode {
        LockFreeNode::alloc(value)
    }

    unsafe fn retire(&self, _pin: &(), node: *mut LockFreeNode) {
        let Some(ptr) = NonNull::new(node) else {
            return;
        };

        let first_retire = unsafe { ptr.as_ref().park() };
        debug_assert!(first_retire, "DUPLICATE retire at {:#x}", node as usize);

        self.deferred.push(DeferredNode { ptr });
    }

    unsafe fn discard(&self, _pin: &(), node: *mut LockFreeNode) {
        // Never linked: nobody else has seen it.
        unsafe { drop(Box::from_raw(node)) };
    }

    fn recycle(&mut self) {
        let mut count = 0usize;
        while let Some(node) = self.deferred.pop() {
            unsafe { drop(Box::from_raw(node.ptr.as_ptr())) };
            count += 1;
        }

        if count > 0 {
            debug!("deferred reclaimer freed {} nodes", count);
        }
    }
}
