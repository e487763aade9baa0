//! Sorted-list sets, one per synchronization strategy.

pub mod arc_lazy_set;
pub mod coarse_set;
pub mod fine_set;
pub mod lazy_set;
pub mod lock_free_set;

pub use arc_lazy_set::ArcLazySet;
pub use coarse_set::CoarseSet;
pub use fine_set::FineSet;
pub use lazy_set::LazySet;
pub use lock_free_set::{CrossbeamEbrSet, EbrSet, LeakySet, LockFreeSet};
