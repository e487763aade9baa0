use parking_lot::lock_api::RawMutex as _;

/// An exclusive lock without data, embeddable in a node.
///
/// Any thread may acquire it, and the thread that acquired it releases it.
///
/// # Safety
///
/// Implementations must provide mutual exclusion: between a successful
/// `acquire` (or `try_acquire` returning `true`) and the matching `release`,
/// no other acquisition may succeed. Releases must have release semantics
/// and acquisitions acquire semantics.
///
pub unsafe trait RawLock: Default + Send + Sync {
    /// Blocks until the lock is owned by the caller.
    fn acquire(&self);

    fn try_acquire(&self) -> bool;

    /// Releases the lock.
    ///
    /// # Safety
    /// The lock must be held by the caller.
    ///
    unsafe fn release(&self);

    /// Acquires the lock and returns a guard that releases it on drop.
    fn lock(&self) -> LockGuard<'_, Self>
    where
        Self: Sized,
    {
        self.acquire();
        LockGuard { lock: self }
    }
}

/// Scoped ownership of a [`RawLock`].
///
/// The lock is released when the guard goes out of scope, including on
/// early returns and `continue` in retry loops.
///
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, L: RawLock> {
    lock: &'a L,
}

impl<L: RawLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // Safety: the guard exists only while the lock is held.
        unsafe { self.lock.release() };
    }
}

/// Blocking lock backed by `parking_lot::RawMutex`.
///
/// The default lock of every lock-based set.
///
pub struct ParkingLock {
    raw: parking_lot::RawMutex,
}

impl Default for ParkingLock {
    fn default() -> Self {
        ParkingLock {
            raw: parking_lot::RawMutex::INIT,
        }
    }
}

unsafe impl RawLock for ParkingLock {
    #[inline]
    fn acquire(&self) {
        self.raw.lock();
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.raw.try_lock()
    }

    #[inline]
    unsafe fn release(&self) {
        unsafe { self.raw.unlock() };
    }
}
