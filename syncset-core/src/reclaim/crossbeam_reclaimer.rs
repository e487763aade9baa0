//! Epoch-based reclaimer using crossbeam-epoch.
//!
//! Serves as a reference point for the per-worker [`EpochReclaimer`]: same
//! lock-free algorithm, but pinning and deferred destruction go through the
//! global crossbeam collector.
//!
//! ```text
//! LockFreeSet<CrossbeamReclaimer>
//!     │
//!     └── Uses crossbeam-epoch for memory safety
//! ```
//!
//! [`EpochReclaimer`]: syncset_epoch::EpochReclaimer

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard, Shared};

use super::Reclaim;
use crate::config::SetConfig;
use crate::data_structures::{Key, LockFreeNode};

/// Crossbeam-epoch reclamation.
///
/// Zero-sized: all state is in the global epoch collector. Worker slots are
/// ignored since crossbeam keeps its own thread-local participants.
///
#[derive(Clone, Copy, Default)]
pub struct CrossbeamReclaimer {}

impl CrossbeamReclaimer {
    pub fn new() -> Self {
        CrossbeamReclaimer {}
    }
}

impl Reclaim for CrossbeamReclaimer {
    /// An actual pinned crossbeam guard.
    type Pin<'a> = CrossbeamGuard;

    const STRATEGY_NAME: &'static str = "lock-free-crossbeam";

    fn with_config(_config: &SetConfig) -> Self {
        Self::new()
    }

    unsafe fn pin(&self, _slot: usize) -> CrossbeamGuard {
        epoch::pin()
    }

    fn alloc(&self, _pin: &CrossbeamGuard, value: Key) -> *mut LockFreeNode {
        LockFreeNode::alloc(value)
    }

    unsafe fn retire(&self, pin: &CrossbeamGuard, node: *mut LockFreeNode) {
        // The destruction runs after every thread pinned now has unpinned.
        unsafe { pin.defer_destroy(Shared::from(node as *const LockFreeNode)) };
    }

    unsafe fn discard(&self, _pin: &CrossbeamGuard, node: *mut LockFreeNode) {
        unsafe { drop(Box::from_raw(node)) };
    }

    fn recycle(&mut self) {
        epoch::pin().flush();
    }
}
