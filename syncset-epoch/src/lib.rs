//! Epoch based reclamation for lock-free linked structures.
//!
//! Every worker owns one slot made of a local epoch and a FIFO free list.
//! A worker pins its slot for the duration of an operation, hands unlinked
//! nodes to its own free list, and takes nodes back out of that list once
//! no other worker that was active at unlink time can still observe them.
//!
//! ```text
//! global epoch ──fetch_add──► slot[i].local_epoch      (pin)
//!                              slot[i].local_epoch = IDLE (unpin)
//!
//! retire(node): node.stamp = global epoch, push_back(slot[i].free_list)
//! reuse():      front.stamp < slot[j].local_epoch for every j != i
//! ```

pub mod epoch;

pub use epoch::{EpochGuard, EpochReclaimer, IDLE_EPOCH, Reclaimable};
