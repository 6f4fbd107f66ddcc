//! `StackAllocator`: LIFO allocation with a small header per block.
//!
//! Each allocation is preceded by a header recording how far the cursor had
//! to move to align it. Freeing the most recent allocation rewinds the cursor
//! to where it stood before that allocation, so no search or merge ever
//! happens.
//!
//! Blocks **must** be freed in exact reverse order. Debug builds also store
//! the previous allocation's address in the header and assert the order on
//! every free; release builds drop that one field and the check, nothing else.

use core::cell::Cell;
use core::mem::size_of;
use core::ptr::{self, NonNull};

use crate::align::{align_forward_adjustment_with_header, is_valid_alignment};
use crate::alloc::allocator::{AllocError, Allocator};
use crate::alloc::region::Region;

#[repr(C)]
#[derive(Clone, Copy)]
struct StackHeader {
    #[cfg(debug_assertions)]
    prev_address: *mut u8,
    adjustment: usize,
}

const HEADER_SIZE: usize = size_of::<StackHeader>();

/// A LIFO allocator.
pub struct StackAllocator<'a> {
    region: Region<'a>,
    /// Offset of the stack top from the region start.
    cursor: Cell<usize>,
    /// Most recent live allocation, used to assert LIFO order.
    #[cfg(debug_assertions)]
    last: Cell<*mut u8>,
}

impl<'a> StackAllocator<'a> {
    /// Bytes of bookkeeping stored in front of every allocation.
    pub const HEADER_SIZE: usize = HEADER_SIZE;

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
        tracing::debug!(capacity = region.size(), header = HEADER_SIZE, "stack allocator created");
        Self {
            region,
            cursor: Cell::new(0),
            #[cfg(debug_assertions)]
            last: Cell::new(ptr::null_mut()),
        }
    }

    /// Address of the current stack top.
    pub fn top(&self) -> NonNull<u8> {
        // SAFETY: the cursor never exceeds the region size.
        unsafe {
            let top = self.region.ptr_at(self.region.start_addr() + self.cursor.get());
            NonNull::new_unchecked(top)
        }
    }
}

impl<'a> Allocator for StackAllocator<'a> {
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(size != 0, "zero-sized allocation");
        debug_assert!(is_valid_alignment(alignment), "alignment must be a power of two");

        let usage = self.region.usage();
        let current = self.region.start_addr() + self.cursor.get();
        let adjustment = align_forward_adjustment_with_header(current, alignment, HEADER_SIZE);

        let needed = adjustment.checked_add(size).ok_or(AllocError)?;
        if needed > self.region.size() - usage.used() {
            #[cfg(feature = "tracing")]
            tracing::warn!(size, alignment, used = usage.used(), "stack allocator exhausted");
            return Err(AllocError);
        }

        // SAFETY: `current + adjustment + size` is within the region (checked above)
        // and `adjustment >= HEADER_SIZE`, so the header fits in front of `aligned`.
        unsafe {
            let aligned = self.region.ptr_at(current + adjustment);
            let header = StackHeader {
                #[cfg(debug_assertions)]
                prev_address: self.last.replace(aligned),
                adjustment,
            };
            ptr::write_unaligned(aligned.sub(HEADER_SIZE).cast::<StackHeader>(), header);

            self.cursor.set(self.cursor.get() + needed);
            usage.on_alloc(needed);
            Ok(NonNull::new_unchecked(aligned))
        }
    }

    /// Frees the most recent allocation.
    ///
    /// # Safety
    /// In addition to the trait contract, `ptr` must be the most recent live
    /// allocation. Debug builds panic otherwise; release builds corrupt the
    /// stack silently.
    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let p = ptr.as_ptr();
        debug_assert!(self.region.contains(p), "pointer does not belong to this allocator");
        #[cfg(debug_assertions)]
        assert!(
            p == self.last.get(),
            "StackAllocator deallocations must happen in reverse allocation order"
        );

        let header = ptr::read_unaligned(p.sub(HEADER_SIZE).cast::<StackHeader>());
        let current = self.region.start_addr() + self.cursor.get();
        let freed = current - p as usize + header.adjustment;

        self.cursor.set(self.cursor.get() - freed);
        #[cfg(debug_assertions)]
        self.last.set(header.prev_address);
        self.region.usage().on_dealloc(freed);
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

// Exclusive owner of its region; the debug back-reference only ever points
// into that region.
unsafe impl<'a> Send for StackAllocator<'a> {}
