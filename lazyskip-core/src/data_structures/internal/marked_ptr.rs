// Marked pointer: a tower cell value made of a node pointer and one mark bit.
//
// Bit layout:
//   Bit 0: REMOVE_MARK - the owning node is being unlinked at this level
//
// The bit lives in the pointer's least significant bit. Every pointee must be
// at least 2-byte aligned; skip nodes are 8-byte aligned (checked where the
// node type is defined).
//
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

const REMOVE_MARK: usize = 0b1;

/// A (pointer, mark) pair packed into one word.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy/PartialEq
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

impl<T> Eq for MarkedPtr<T> {}

impl<T> fmt::Debug for MarkedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkedPtr")
            .field("ptr", &self.as_ptr())
            .field("marked", &self.is_marked())
            .finish()
    }
}

impl<T> MarkedPtr<T> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Pair a clean pointer with a mark bit.
    #[inline]
    pub(crate) fn new(ptr: *mut T, marked: bool) -> Self {
        debug_assert_eq!(ptr as usize & REMOVE_MARK, 0, "pointer is misaligned");
        let bits = if marked {
            ptr as usize | REMOVE_MARK
        } else {
            ptr as usize
        };
        MarkedPtr {
            ptr: bits as *mut T,
        }
    }

    /// Unmarked null.
    #[inline]
    pub(crate) fn null() -> Self {
        MarkedPtr {
            ptr: ptr::null_mut(),
        }
    }

    #[inline]
    fn from_raw(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// The clean pointer without the mark bit (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        (self.ptr as usize & !REMOVE_MARK) as *mut T
    }

    /// The raw word with the mark bit intact (for CAS operations).
    #[inline]
    fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & REMOVE_MARK) != 0
    }

    #[inline]
    pub(crate) fn is_null(&self) -> bool {
        self.as_ptr().is_null()
    }

    // =========================================================================
    // Transformers
    // =========================================================================

    /// Same pointer, mark bit set to `mark`.
    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Self {
        MarkedPtr::new(self.as_ptr(), mark)
    }
}

/// Atomic tower cell holding a [`MarkedPtr`].
///
/// Loads and stores move the pointer and the mark together, so a reader never
/// observes one half of an update.
pub(crate) struct AtomicMarkedPtr<T> {
    inner: AtomicPtr<T>,
}

impl<T> AtomicMarkedPtr<T> {
    pub(crate) fn new(value: MarkedPtr<T>) -> Self {
        AtomicMarkedPtr {
            inner: AtomicPtr::new(value.as_raw()),
        }
    }

    /// Load with Acquire ordering.
    #[inline]
    pub(crate) fn load(&self) -> MarkedPtr<T> {
        MarkedPtr::from_raw(self.inner.load(Ordering::Acquire))
    }

    /// Store with Release ordering.
    #[inline]
    pub(crate) fn store(&self, value: MarkedPtr<T>) {
        self.inner.store(value.as_raw(), Ordering::Release);
    }

    /// CAS on the (pointer, mark) pair as one unit.
    ///
    /// Returns the previous value on success and the observed value on failure.
    #[inline]
    pub(crate) fn compare_exchange(
        &self,
        current: MarkedPtr<T>,
        new: MarkedPtr<T>,
    ) -> Result<MarkedPtr<T>, MarkedPtr<T>> {
        self.inner
            .compare_exchange(
                current.as_raw(),
                new.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(MarkedPtr::from_raw)
            .map_err(MarkedPtr::from_raw)
    }

    /// Set the mark bit, provided the cell still points at `expected`.
    ///
    /// Returns `true` if this call set the bit. Returns `false` if the bit was
    /// already set or the pointer moved away from `expected`.
    pub(crate) fn try_mark(&self, expected: *mut T) -> bool {
        let mut current = self.load();
        loop {
            if current.as_ptr() != expected || current.is_marked() {
                return false;
            }
            match self.compare_exchange(current, current.with_mark(true)) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}
