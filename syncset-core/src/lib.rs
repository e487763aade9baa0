//! Concurrent ordered integer sets under different synchronization strategies.
//!
//! # Strategies
//!
//! | Set | Synchronization |
//! |-----|-----------------|
//! | [`CoarseSet`] | one lock for the whole list |
//! | [`FineSet`] | hand-over-hand node locks |
//! | [`LazySet`] | unlocked scan, lock two nodes, validate |
//! | [`ArcLazySet`] | same as `LazySet`, nodes reference counted |
//! | [`LeakySet`] | lock-free, unlinked nodes kept until `clear` |
//! | [`EbrSet`] | lock-free, per-worker epoch reclamation |
//! | [`CrossbeamEbrSet`] | lock-free, crossbeam-epoch reclamation |
//!
//! Every thread registers with the set and passes its [`Worker`] to each
//! operation:
//!
//! ```
//! use syncset_core::{EbrSet, OrderedSet};
//!
//! let set = EbrSet::new();
//! let worker = set.register().unwrap();
//! assert!(set.add(&worker, 5));
//! assert!(!set.add(&worker, 5));
//! assert!(set.contains(&worker, 5));
//! assert!(set.remove(&worker, 5));
//! ```

pub mod common_tests;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod history;
pub mod reclaim;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use config::SetConfig;
pub use data_structures::{
    ArcLazySet, CoarseSet, CrossbeamEbrSet, EbrSet, FineSet, HEAD_KEY, Key, LazySet, LeakySet,
    LockFreeSet, OrderedSet, TAIL_KEY,
};
pub use error::{ConsistencyError, SetError};
pub use history::{ConsistencyReport, History, OpKind, Workload, check_consistency};
pub use reclaim::Reclaim;
pub use strategy::Strategy;
pub use worker::{Worker, WorkerRegistry};
