//! `LinearAllocator`: a monotonic bump allocator over a borrowed region.
//!
//! Allocation only bumps a cursor. There is no per-object free, since no
//! header is stored; the whole arena is reclaimed at once with
//! [`LinearAllocator::clear`], typically at the end of a frame.

use core::cell::Cell;
use core::ptr::NonNull;

use crate::align::{align_forward_adjustment, is_valid_alignment};
use crate::alloc::allocator::{AllocError, Allocator};
use crate::alloc::region::Region;

/// A bump allocator.
///
/// # Example
///
/// ```rust
/// use strata::alloc::{Allocator, LinearAllocator};
///
/// let mut frame = [0u8; 256];
/// let mut arena = LinearAllocator::new(&mut frame);
///
/// let a = arena.allocate(24, 8).unwrap();
/// let _b = arena.allocate(3, 1).unwrap();
/// assert_eq!(arena.live_allocations(), 2);
///
/// arena.clear();
/// assert_eq!(arena.used_bytes(), 0);
/// assert_eq!(arena.allocate(24, 8).unwrap(), a);
/// arena.clear();
/// ```
pub struct LinearAllocator<'a> {
    region: Region<'a>,
    /// Offset of the next free byte from the region start.
    cursor: Cell<usize>,
}

impl<'a> LinearAllocator<'a> {
    /// Creates an allocator over `memory`.
    ///
    /// # Panics
    /// Panics if `memory` is empty.
    pub fn new(memory: &'a mut [u8]) -> Self {
        Self::with_region(Region::new(memory))
    }

    /// Creates an allocator over a raw span.
    ///
    /// # Safety
    /// `start..start + size` must be valid for reads and writes for `'a` and
    /// must not be accessed through any other path meanwhile.
    pub unsafe fn from_raw_parts(start: NonNull<u8>, size: usize) -> Self {
        Self::with_region(Region::from_raw_parts(start, size))
    }

    fn with_region(region: Region<'a>) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity = region.size(), "linear allocator created");
        Self {
            region,
            cursor: Cell::new(0),
        }
    }

    /// Releases every allocation at once.
    ///
    /// Taking `&mut self` guarantees no proxy or other borrower is mid-call;
    /// pointers handed out earlier must simply not be used again.
    pub fn clear(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            used = self.region.usage().used(),
            live = self.region.usage().live(),
            "linear allocator cleared"
        );
        self.cursor.set(0);
        self.region.usage().reset();
    }
}

impl<'a> Allocator for LinearAllocator<'a> {
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(size != 0, "zero-sized allocation");
        debug_assert!(is_valid_alignment(alignment), "alignment must be a power of two");

        let usage = self.region.usage();
        let current = self.region.start_addr() + self.cursor.get();
        let adjustment = align_forward_adjustment(current, alignment);

        let needed = adjustment.checked_add(size).ok_or(AllocError)?;
        if needed > self.region.size() - usage.used() {
            #[cfg(feature = "tracing")]
            tracing::warn!(size, alignment, used = usage.used(), "linear allocator exhausted");
            return Err(AllocError);
        }

        // SAFETY: `cursor + adjustment + size <= size` was checked above.
        let aligned = unsafe { self.region.ptr_at(current + adjustment) };
        self.cursor.set(self.cursor.get() + needed);
        usage.on_alloc(needed);

        // SAFETY: derived from the non-null region start.
        Ok(unsafe { NonNull::new_unchecked(aligned) })
    }

    /// Always panics: a linear allocator can only be reset as a whole.
    unsafe fn deallocate(&self, _ptr: NonNull<u8>) {
        panic!("LinearAllocator does not support individual deallocation; use clear()");
    }

    fn capacity(&self) -> usize {
        self.region.size()
    }

    fn used_bytes(&self) -> usize {
        self.region.usage().used()
    }

    fn live_allocations(&self) -> usize {
        self.region.usage().live()
    }

    fn start(&self) -> NonNull<u8> {
        self.region.start()
    }
}

// The allocator owns exclusive access to its region; nothing is shared with
// other threads. Not Sync because state lives in `Cell`s.
unsafe impl<'a> Send for LinearAllocator<'a> {}
