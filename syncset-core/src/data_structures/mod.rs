//! Concurrent ordered sets.
//!
//! # Organization
//!
//! - [`sorted`] - The set strategies (Coarse, Fine, Lazy, LazyArc, LockFree)
//! - [`ordered_set`] - The contract they share
//! - `internal` - Node layouts, marked links and validation (pub(crate))

pub(crate) mod internal;
pub mod ordered_set;
pub mod sorted;

pub use ordered_set::{OrderedSet, PREVIEW_LEN};
pub use sorted::{ArcLazySet, CoarseSet, CrossbeamEbrSet, EbrSet, FineSet, LazySet, LeakySet, LockFreeSet};

// Key and sentinels are public; links and lock nodes stay internal.
pub use internal::{HEAD_KEY, Key, LockFreeNode, TAIL_KEY, is_storable};
