//! Reclaim trait for the lock-free sets.
//!
//! The lock-free algorithm is the same for every reclamation scheme; what
//! changes is how a node is obtained for an insertion and what happens to a
//! node once it has been unlinked.
//!
//! # Design
//!
//! ```text
//! LockFreeSet<R: Reclaim>
//!     │
//!     ├── LockFreeSet<DeferredReclaimer>            (no reclamation until clear/drop)
//!     ├── LockFreeSet<EpochReclaimer<LockFreeNode>> (per-worker epochs, node reuse)
//!     └── LockFreeSet<CrossbeamReclaimer>           (crossbeam-epoch)
//! ```
//!
//! Every public operation of the set is bracketed by a pin:
//!
//! ```text
//! let pin = reclaimer.pin(slot);   // StartOp
//! ... find / CAS / retire ...
//! drop(pin);                       // EndOp
//! ```

mod crossbeam_reclaimer;
mod deferred_reclaimer;
mod epoch_reclaimer;

pub use crossbeam_reclaimer::CrossbeamReclaimer;
pub use deferred_reclaimer::DeferredReclaimer;
pub use syncset_epoch::EpochReclaimer;

use crate::config::SetConfig;
use crate::data_structures::{Key, LockFreeNode};

/// A memory reclamation scheme for [`LockFreeNode`]s.
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. A retired node is not freed or handed out by `alloc` while any worker
///    that was pinned when it was retired is still pinned
/// 2. `recycle` is only reachable through `&mut self`, so no pin is alive
///
pub trait Reclaim: Send + Sync + Sized {
    /// Protects every node read by the worker until dropped.
    type Pin<'a>
    where
        Self: 'a;

    /// Name of the lock-free strategy built on this scheme.
    const STRATEGY_NAME: &'static str;

    fn with_config(config: &SetConfig) -> Self;

    /// Start an operation for the worker owning `slot`.
    ///
    /// # Safety
    /// - `slot` must be owned by the calling thread for the lifetime of the pin
    /// - The slot must not already be pinned
    ///
    unsafe fn pin(&self, slot: usize) -> Self::Pin<'_>;

    /// A node holding `value` with a null, unmarked next link.
    ///
    fn alloc(&self, pin: &Self::Pin<'_>, value: Key) -> *mut LockFreeNode;

    /// Hand over a node that has just been unlinked.
    ///
    /// # Safety
    /// - `node` must come from `alloc` of this reclaimer
    /// - `node` must be unreachable from the set's head
    /// - Exactly one thread retires a given unlink
    ///
    unsafe fn retire(&self, pin: &Self::Pin<'_>, node: *mut LockFreeNode);

    /// Give back a node that was allocated but never published.
    ///
    /// # Safety
    /// `node` must come from `alloc` and never have been linked.
    ///
    unsafe fn discard(&self, pin: &Self::Pin<'_>, node: *mut LockFreeNode) {
        unsafe { self.retire(pin, node) }
    }

    /// Release everything held back for deferred reclamation.
    fn recycle(&mut self);
}
