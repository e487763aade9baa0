use std::sync::Arc;

use super::node::{ArcNode, LockNode};
use crate::sync::RawLock;

/// Re-check a `(prev, curr)` pair found by an unlocked scan.
///
/// Holds when neither node is logically removed and `prev` still links to
/// `curr`. Only meaningful while both nodes are locked by the caller.
///
/// # Safety
/// Both pointers must reference nodes that have not been freed.
///
#[inline]
pub(crate) unsafe fn validate<L: RawLock>(prev: *mut LockNode<L>, curr: *mut LockNode<L>) -> bool {
    unsafe { !(*prev).is_removed() && !(*curr).is_removed() && (*prev).next() == curr }
}

/// [`validate`] for reference-counted nodes.
#[inline]
pub(crate) fn validate_shared<L: RawLock>(prev: &Arc<ArcNode<L>>, curr: &Arc<ArcNode<L>>) -> bool {
    !prev.is_removed() && !curr.is_removed() && prev.links_to(curr)
}
