//! `PoolAllocator`: fixed-size slots threaded on an intrusive free list.
//!
//! The region is cut into equal slots starting at the first address aligned
//! to the object alignment. While free, a slot stores only a pointer to the
//! next free slot, so the pool carries no metadata outside the region.
//! Allocation pops the list head and deallocation pushes onto it: O(1), no
//! search, no merging.

use core::cell::Cell;
use core::mem::size_of;
use core::ptr::{self, NonNull};

use crate::align::{align_forward_adjustment, is_valid_alignment};
use crate::alloc::allocator::{AllocError, Allocator};
use crate::alloc::region::Region;

#[inline(always)]
unsafe fn read_next(slot: *mut u8) -> *mut u8 {
    ptr::read_unaligned(slot.cast::<*mut u8>())
}

#[inline(always)]
unsafe fn write_next(slot: *mut u8, next: *mut u8) {
    ptr::write_unaligned(slot.cast::<*mut u8>(), next);
}

/// A fixed-size object pool.
pub struct PoolAllocator<'a> {
    region: Region<'a>,
    object_size: usize,
    object_alignment: usize,
    slot_count: usize,
    /// Address of the first slot.
    first_slot: usize,
    free_head: Cell<*mut u8>,
}

impl<'a> PoolAllocator<'a> {
    /// Creates a pool of `object_size`-byte slots aligned to `object_alignment`.
    ///
    /// # Panics
    /// Panics if `memory` is empty, if `object_size` is smaller than a
    /// pointer or not a multiple of `object_alignment`, if the alignment is
    /// not a power of two, or if not a single slot fits after alignment.
    pub fn new(memory: &'a mut [u8], object_size: usize, object_alignment: usize) -> Self {
        Self::with_region(Region::new(memory), object_size, object_alignment)
    }

    /// Creates a pool over a raw span.
    ///
    /// # Safety
    /// `start..start + size` must be valid for reads and writes for `'a` and
    /// must not be accessed through any other path meanwhile.
    pub unsafe fn from_raw_parts(
        start: NonNull<u8>,
        size: usize,
        object_size: usize,
        object_alignment: usize,
    ) -> Self {
        Self::with_region(Region::from_raw_parts(start, size), object_size, object_alignment)
    }

    /// Creates a pool sized and aligned for values of type `T`.
    ///
    /// # Panics
    /// Panics under the same conditions as [`new`](Self::new); in particular
    /// `T` must be at least pointer-sized.
    pub fn for_type<T>(memory: &'a mut [u8]) -> Self {
        Self::new(memory, size_of::<T>(), core::mem::align_of::<T>())
    }

    fn with_region(region: Region<'a>, object_size: usize, object_alignment: usize) -> Self {
        assert!(is_valid_alignment(object_alignment), "object alignment must be a power of two");
        assert!(
            object_size >= size_of::<*mut u8>(),
            "pool objects must be at least pointer-sized, got {object_size}"
        );
        assert!(
            object_size % object_alignment == 0,
            "pool object size {object_size} is not a multiple of its alignment {object_alignment}"
        );

        let adjustment = align_forward_adjustment(region.start_addr(), object_alignment);
        let slot_count = region.size().saturating_sub(adjustment) / object_size;
        assert!(
            slot_count > 0,
            "region of {} bytes holds no {object_size}-byte slot after alignment",
            region.size()
        );

        // SAFETY: `adjustment + slot_count * object_size <= size`, so every slot is in-region.
        let first = unsafe {
            let first = region.ptr_at(region.start_addr() + adjustment);
            let mut slot = first;
            for _ in 1..slot_count {
                let next = slot.add(object_size);
                write_next(slot, next);
                slot = next;
            }
            write_next(slot, ptr::null_mut());
            first
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            capacity = region.size(),
            object_size,
            object_alignment,
            slot_count,
            "pool allocator created"
        );

        Self {
            region,
            object_size,
            object_alignment,
            slot_count,
            first_slot: first as usize,
            free_head: Cell::new(first),
        }
    }

    /// Size of every slot.
    #[inline]
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Alignment of every slot.
    #[inline]
    pub fn object_alignment(&self) -> usize {
        self.object_alignment
    }

    /// Number of slots carved at construction.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Number of slots currently on the free list.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.slot_count - self.region.usage().live()
    }

    /// Walks the free list and counts its nodes.
    ///
    /// Slower than [`free_slots`](Self::free_slots) but independent of the
    /// counters, which makes it useful for checking list integrity.
    pub fn free_list_len(&self) -> usize {
        let mut len = 0;
        let mut slot = self.free_head.get();
        while !slot.is_null() {
            len += 1;
            // SAFETY: free-list nodes are in-region slots written by the pool.
            slot = unsafe { read_next(slot) };
        }
        len
    }
}

impl<'a> Allocator for PoolAllocator<'a> {
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(
            size == self.object_size && alignment == self.object_alignment,
            "pool serves {}-byte/{}-aligned objects, asked for {size}/{alignment}",
            self.object_size,
            self.object_alignment,
        );

        let slot = self.free_head.get();
        let Some(slot) = NonNull::new(slot) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(object_size = self.object_size, "pool exhausted");
            return Err(AllocError);
        };

        // SAFETY: `slot` heads the free list, so its first word is the next link.
        self.free_head.set(unsafe { read_next(slot.as_ptr()) });
        self.region.usage().on_alloc(self.object_size);
        Ok(slot)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let p = ptr.as_ptr();
        debug_assert!(self.region.contains(p), "pointer does not belong to this pool");
        debug_assert!(
            p as usize >= self.first_slot && (p as usize - self.first_slot) % self.object_size == 0,
            "pointer is not a slot boundary"
        );

        write_next(p, self.free_head.get());
        self.free_head.set(p);
        self.region.usage().on_dealloc(self.object_size);
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

// Exclusive owner of its region; free-list links stay inside it.
unsafe impl<'a> Send for PoolAllocator<'a> {}
