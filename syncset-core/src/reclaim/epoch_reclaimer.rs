use std::ptr::NonNull;

use syncset_epoch::{EpochGuard, EpochReclaimer};

use super::Reclaim;
use crate::config::SetConfig;
use crate::data_structures::{Key, LockFreeNode};

/// Per-worker epochs with node reuse.
///
/// `alloc` prefers the oldest node of the worker's free list once every
/// other worker is idle or started after that node was retired.
///
impl Reclaim for EpochReclaimer<LockFreeNode> {
    type Pin<'a> = EpochGuard<'a, LockFreeNode>;

    const STRATEGY_NAME: &'static str = "lock-free-ebr";

    fn with_config(config: &SetConfig) -> Self {
        EpochReclaimer::new(config.max_workers, config.free_list_limit)
    }

    unsafe fn pin(&self, slot: usize) -> Self::Pin<'_> {
        unsafe { EpochReclaimer::pin(self, slot) }
    }

    fn alloc(&self, pin: &Self::Pin<'_>, value: Key) -> *mut LockFreeNode {
        match pin.reuse() {
            Some(node) => {
                unsafe { node.as_ref().reset(value) };
                node.as_ptr()
            }
            None => LockFreeNode::alloc(value),
        }
    }

    unsafe fn retire(&self, pin: &Self::Pin<'_>, node: *mut LockFreeNode) {
        if let Some(node) = NonNull::new(node) {
            unsafe { pin.retire(node) };
        }
    }

    fn recycle(&mut self) {
        EpochReclaimer::recycle(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Reclaimer = EpochReclaimer<LockFreeNode>;

    #[test]
    fn test_alloc_reuses_retired_node() {
        let reclaimer = Reclaimer::with_config(&SetConfig::default().with_max_workers(2));
        let pin = unsafe { Reclaim::pin(&reclaimer, 0) };

        let first = reclaimer.alloc(&pin, 1);
        unsafe { reclaimer.retire(&pin, first) };

        let second = reclaimer.alloc(&pin, 2);
        assert_eq!(first, second);
        unsafe {
            assert_eq!((*second).value(), 2);
            assert!(!(*second).next().is_marked());
            reclaimer.retire(&pin, second);
        }
        assert_eq!(reclaimer.reused_count(), 1);
    }

    #[test]
    fn test_alloc_fresh_while_other_worker_pinned() {
        let reclaimer = Reclaimer::with_config(&SetConfig::default().with_max_workers(2));
        let reader = unsafe { Reclaim::pin(&reclaimer, 1) };
        let pin = unsafe { Reclaim::pin(&reclaimer, 0) };

        let first = reclaimer.alloc(&pin, 1);
        unsafe { reclaimer.retire(&pin, first) };

        let second = reclaimer.alloc(&pin, 2);
        assert_ne!(first, second);
        unsafe { reclaimer.retire(&pin, second) };

        drop(reader);
    }
}
