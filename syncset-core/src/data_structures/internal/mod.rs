//! Internal implementation details.
//!
//! Node layouts, the marked reference and the lazy validator. Only the node
//! of the lock-free sets is public (it appears in the reclaimer types).

pub mod marked_ptr;
pub mod node;
pub mod validation;

pub(crate) use node::{ArcNode, LockNode, PlainNode};
pub use node::{HEAD_KEY, Key, LockFreeNode, TAIL_KEY, is_storable};
pub(crate) use validation::{validate, validate_shared};
