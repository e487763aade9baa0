//! Lock capability consumed by the lock-based sets.

mod lock;
mod spin_lock;

pub use lock::{LockGuard, ParkingLock, RawLock};
pub use spin_lock::SpinLock;
