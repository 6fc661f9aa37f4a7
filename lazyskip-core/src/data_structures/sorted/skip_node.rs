use std::alloc::{Layout, alloc, dealloc};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::data_structures::internal::marked_ptr::{AtomicMarkedPtr, MarkedPtr};
use crate::error::{Result, SkipListError};

pub(crate) type SkipNodePtr<T> = *mut SkipNode<T>;

/// A skip list node with an inline tower.
///
/// Uses the flexible array member pattern:
/// - One allocation per node; header and tower are freed together
/// - Tower cells are inline after the header fields
/// - Layout: [header][tower[0..height]]
///
/// Sentinels carry no value. Their key is never compared: the head is below
/// and the tail above every data key, and both are identified by address.
#[repr(C)]
pub(crate) struct SkipNode<T> {
    value: Option<T>,
    key: u64,
    height: usize,
    marked: AtomicBool,
    fully_linked: AtomicBool,
    lock: Mutex<()>,
    // Flexible array: `height` cells allocated inline after this struct
    tower: [AtomicMarkedPtr<SkipNode<T>>; 0],
}

impl<T> SkipNode<T> {
    // The mark bit is packed into bit 0 of tower pointers.
    const ALIGN_CHECK: () = assert!(std::mem::align_of::<Self>() >= 2);

    /// Layout of a node with `height` tower cells.
    fn layout(height: usize) -> Result<Layout> {
        let alloc_failed = || SkipListError::AllocFailed {
            height,
            size: usize::MAX,
        };
        let tower = Layout::array::<AtomicMarkedPtr<Self>>(height).map_err(|_| alloc_failed())?;
        let (layout, _) = Layout::new::<Self>()
            .extend(tower)
            .map_err(|_| alloc_failed())?;
        Ok(layout.pad_to_align())
    }

    fn alloc_node(value: Option<T>, key: u64, height: usize) -> Result<*mut Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::ALIGN_CHECK;
        debug_assert!(height > 0);

        let layout = Self::layout(height)?;

        unsafe {
            let ptr = alloc(layout) as *mut Self;
            if ptr.is_null() {
                return Err(SkipListError::AllocFailed {
                    height,
                    size: layout.size(),
                });
            }

            ptr::addr_of_mut!((*ptr).value).write(value);
            ptr::addr_of_mut!((*ptr).key).write(key);
            ptr::addr_of_mut!((*ptr).height).write(height);
            ptr::addr_of_mut!((*ptr).marked).write(AtomicBool::new(false));
            ptr::addr_of_mut!((*ptr).fully_linked).write(AtomicBool::new(false));
            ptr::addr_of_mut!((*ptr).lock).write(Mutex::new(()));

            let tower_base = ptr::addr_of_mut!((*ptr).tower) as *mut AtomicMarkedPtr<Self>;
            for level in 0..height {
                tower_base
                    .add(level)
                    .write(AtomicMarkedPtr::new(MarkedPtr::null()));
            }

            Ok(ptr)
        }
    }

    /// Allocate an unlinked data node.
    pub(crate) fn alloc_with_value(value: T, key: u64, height: usize) -> Result<*mut Self> {
        Self::alloc_node(Some(value), key, height)
    }

    /// Allocate a sentinel. Sentinels are born fully linked.
    pub(crate) fn alloc_sentinel(key: u64, height: usize) -> Result<*mut Self> {
        let ptr = Self::alloc_node(None, key, height)?;
        unsafe { (*ptr).set_fully_linked() };
        Ok(ptr)
    }

    /// Drop the value and release header and tower as one block.
    ///
    /// # Safety
    /// - `ptr` came from `alloc_with_value` or `alloc_sentinel`
    /// - The node is unreachable and no guard can still reference it
    /// - Called at most once per node
    pub(crate) unsafe fn dealloc_node(ptr: *mut Self) {
        unsafe {
            let height = (*ptr).height;
            ptr::drop_in_place(ptr);
            // The layout was computed once successfully for this height.
            if let Ok(layout) = Self::layout(height) {
                dealloc(ptr as *mut u8, layout);
            }
        }
    }

    // =========================================================================
    // Immutable fields
    // =========================================================================

    #[inline]
    pub(crate) fn key(&self) -> u64 {
        self.key
    }

    #[inline]
    pub(crate) fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    // =========================================================================
    // Tower access
    // =========================================================================

    #[inline]
    fn cell(&self, level: usize) -> &AtomicMarkedPtr<SkipNode<T>> {
        debug_assert!(level < self.height, "level {level} >= height {}", self.height);
        unsafe { &*self.tower.as_ptr().add(level) }
    }

    /// Load the next cell at `level` (Acquire).
    #[inline]
    pub(crate) fn next(&self, level: usize) -> MarkedPtr<SkipNode<T>> {
        self.cell(level).load()
    }

    /// Clean next pointer at `level`.
    #[inline]
    pub(crate) fn next_ptr(&self, level: usize) -> SkipNodePtr<T> {
        let next = self.next(level);
        debug_assert!(!next.is_null(), "unset tower cell at level {level}");
        next.as_ptr()
    }

    /// Store the next cell at `level` (Release).
    #[inline]
    pub(crate) fn set_next(&self, level: usize, next: MarkedPtr<SkipNode<T>>) {
        self.cell(level).store(next);
    }

    /// Flag the cell at `level` as being removed, keeping its pointer.
    #[inline]
    pub(crate) fn mark_level(&self, level: usize) -> bool {
        let cell = self.cell(level);
        cell.try_mark(cell.load().as_ptr())
    }

    // =========================================================================
    // Flags
    // =========================================================================

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    /// Logically delete the node. Returns `false` if it was already marked.
    #[inline]
    pub(crate) fn mark(&self) -> bool {
        !self.marked.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn is_fully_linked(&self) -> bool {
        self.fully_linked.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_fully_linked(&self) {
        self.fully_linked.store(true, Ordering::Release);
    }

    /// Present: fully linked and not marked.
    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        self.is_fully_linked() && !self.is_marked()
    }

    // =========================================================================
    // Lock
    // =========================================================================

    #[inline]
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.lock.try_lock()
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}
