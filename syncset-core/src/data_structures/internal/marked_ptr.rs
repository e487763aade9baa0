// Marked pointer operations using the LSB as the logical-deletion mark.
//
// Bit layout:
//   Bit 0: DELETE_MARK - the node owning this link is logically removed
//
// The mark travels in the same word as the successor address, so a single
// CAS can check "successor is X and I am not deleted" and swing the link.
//
use std::sync::atomic::{AtomicPtr, Ordering};

const DELETE_MARK: usize = 0b1;

/// A pointer with the least significant bit used as the deletion mark.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy
impl<T> Copy for MarkedPtr<T> {}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for MarkedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> std::fmt::Debug for MarkedPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarkedPtr({:p}, {})", self.as_ptr(), self.is_marked())
    }
}

impl<T> MarkedPtr<T> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Pack a clean pointer and a mark.
    #[inline]
    pub(crate) fn new(ptr: *mut T, mark: bool) -> Self {
        debug_assert_eq!(ptr as usize & DELETE_MARK, 0, "pointer is not aligned");
        MarkedPtr {
            ptr: (ptr as usize | mark as usize) as *mut T,
        }
    }

    /// Wrap a (possibly marked) raw word.
    #[inline]
    pub(crate) fn from_raw(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// Get the clean pointer without the mark (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        (self.ptr as usize & !DELETE_MARK) as *mut T
    }

    /// Get the raw word with the mark intact (for CAS operations).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & DELETE_MARK) != 0
    }

    /// Pointer and mark read from the same word.
    #[inline]
    pub(crate) fn split(&self) -> (*mut T, bool) {
        (self.as_ptr(), self.is_marked())
    }
}

/// An atomically updatable (pointer, mark) pair.
///
pub(crate) struct AtomicMarkedPtr<T> {
    inner: AtomicPtr<T>,
}

impl<T> AtomicMarkedPtr<T> {
    pub(crate) fn new(ptr: *mut T, mark: bool) -> Self {
        AtomicMarkedPtr {
            inner: AtomicPtr::new(MarkedPtr::new(ptr, mark).as_raw()),
        }
    }

    /// Load pointer and mark together (Acquire ordering)
    #[inline]
    pub(crate) fn load(&self) -> MarkedPtr<T> {
        MarkedPtr::from_raw(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.load().as_ptr()
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.load().is_marked()
    }

    /// Store pointer and mark (Release ordering)
    #[inline]
    pub(crate) fn store(&self, ptr: *mut T, mark: bool) {
        self.inner
            .store(MarkedPtr::new(ptr, mark).as_raw(), Ordering::Release)
    }

    /// Replace (expected_ptr, expected_mark) with (new_ptr, new_mark) if both match.
    ///
    #[inline]
    pub(crate) fn compare_and_set(
        &self,
        expected_ptr: *mut T,
        new_ptr: *mut T,
        expected_mark: bool,
        new_mark: bool,
    ) -> bool {
        let expected = MarkedPtr::new(expected_ptr, expected_mark);
        let new = MarkedPtr::new(new_ptr, new_mark);
        self.inner
            .compare_exchange(
                expected.as_raw(),
                new.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Set the mark on an unmarked link that still points at `expected_ptr`.
    ///
    /// The pointer is left unchanged.
    ///
    #[inline]
    pub(crate) fn attempt_mark(&self, expected_ptr: *mut T, new_mark: bool) -> bool {
        self.compare_and_set(expected_ptr, expected_ptr, false, new_mark)
    }
}
