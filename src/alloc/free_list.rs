//! `FreeListAllocator`: general-purpose allocation over an intrusive,
//! address-ordered free list.
//!
//! Free memory is described by `FreeBlock { size, next }` nodes written into
//! the free memory itself, kept sorted by address. Allocation takes the
//! **first** block large enough (first fit) and carves the request from its
//! front. Deallocation reinserts the block in address order and merges it
//! with contiguous neighbours on both sides, so a workload that frees
//! everything always converges back to a single block spanning the region.

use core::cell::Cell;
use core::mem::size_of;
use core::ptr::{self, NonNull};

use crate::align::{align_forward_adjustment_with_header, is_valid_alignment};
use crate::alloc::allocator::{AllocError, Allocator};
use crate::alloc::region::Region;

/// Header stored immediately before every returned address.
#[repr(C)]
#[derive(Clone, Copy)]
struct AllocationHeader {
    /// Bytes taken from the free block, adjustment included.
    size: usize,
    /// Distance from the block start to the returned address.
    adjustment: usize,
}

/// Node threaded through free memory.
#[repr(C)]
#[derive(Clone, Copy)]
struct FreeBlock {
    size: usize,
    next: *mut u8,
}

const HEADER_SIZE: usize = size_of::<AllocationHeader>();

// Every allocation spans more than a header, so a freed block can always
// hold a `FreeBlock` node.
const _: () = assert!(size_of::<AllocationHeader>() >= size_of::<FreeBlock>());

// Nodes and headers may land on any byte boundary; always access them unaligned.
#[inline(always)]
unsafe fn read_block(at: *mut u8) -> FreeBlock {
    ptr::read_unaligned(at.cast::<FreeBlock>())
}

#[inline(always)]
unsafe fn write_block(at: *mut u8, block: FreeBlock) {
    ptr::write_unaligned(at.cast::<FreeBlock>(), block);
}

/// A first-fit allocator with coalescing.
pub struct FreeListAllocator<'a> {
    region: Region<'a>,
    /// Lowest-addressed free block, or null when the region is full.
    head: Cell<*mut u8>,
}

impl<'a> FreeListAllocator<'a> {
    /// Bytes of bookkeeping stored in front of every allocation.
    pub const HEADER_SIZE: usize = HEADER_SIZE;

    /// Creates an allocator whose free list is one block covering `memory`.
    ///
    /// # Panics
    /// Panics if `memory` is too small to hold a free-block node.
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
        assert!(
            region.size() >= size_of::<FreeBlock>(),
            "region of {} bytes cannot hold a free-list node",
            region.size()
        );

        let head = region.start().as_ptr();
        // SAFETY: the region is at least one node long.
        unsafe {
            write_block(
                head,
                FreeBlock {
                    size: region.size(),
                    next: ptr::null_mut(),
                },
            );
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            capacity = region.size(),
            header = HEADER_SIZE,
            "free-list allocator created"
        );

        Self {
            region,
            head: Cell::new(head),
        }
    }

    /// Points `prev.next` (or the list head when `prev` is null) at `next`.
    #[inline(always)]
    unsafe fn relink(&self, prev: *mut u8, next: *mut u8) {
        if prev.is_null() {
            self.head.set(next);
        } else {
            let mut node = read_block(prev);
            node.next = next;
            write_block(prev, node);
        }
    }

    /// Snapshot of the free list as `(offset, size)` pairs in address order.
    pub fn free_blocks(&self) -> Vec<(usize, usize)> {
        let mut blocks = Vec::new();
        let mut cursor = self.head.get();
        while !cursor.is_null() {
            // SAFETY: every list node lies inside the region and was written by us.
            let node = unsafe { read_block(cursor) };
            blocks.push((cursor as usize - self.region.start_addr(), node.size));
            cursor = node.next;
        }
        blocks
    }

    /// Number of blocks on the free list.
    pub fn free_block_count(&self) -> usize {
        self.free_blocks().len()
    }

    /// Size of the largest free block, or 0 if the region is exhausted.
    pub fn largest_free_block(&self) -> usize {
        self.free_blocks().iter().map(|&(_, size)| size).max().unwrap_or(0)
    }
}

impl<'a> Allocator for FreeListAllocator<'a> {
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(size != 0, "zero-sized allocation");
        debug_assert!(is_valid_alignment(alignment), "alignment must be a power of two");

        let mut prev: *mut u8 = ptr::null_mut();
        let mut block = self.head.get();

        while !block.is_null() {
            // SAFETY: list nodes are valid, in-region `FreeBlock`s.
            unsafe {
                let node = read_block(block);
                let adjustment =
                    align_forward_adjustment_with_header(block as usize, alignment, HEADER_SIZE);

                let fits = size
                    .checked_add(adjustment)
                    .filter(|&total| total <= node.size);
                let Some(mut total) = fits else {
                    prev = block;
                    block = node.next;
                    continue;
                };

                if node.size - total <= HEADER_SIZE {
                    // The tail could never host an allocation; hand it out too.
                    total = node.size;
                    self.relink(prev, node.next);
                } else {
                    let rest = block.add(total);
                    write_block(
                        rest,
                        FreeBlock {
                            size: node.size - total,
                            next: node.next,
                        },
                    );
                    self.relink(prev, rest);
                }

                let aligned = block.add(adjustment);
                ptr::write_unaligned(
                    aligned.sub(HEADER_SIZE).cast::<AllocationHeader>(),
                    AllocationHeader {
                        size: total,
                        adjustment,
                    },
                );

                self.region.usage().on_alloc(total);
                return Ok(NonNull::new_unchecked(aligned));
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            size,
            alignment,
            used = self.region.usage().used(),
            "free-list allocator has no block large enough"
        );
        Err(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let p = ptr.as_ptr();
        debug_assert!(self.region.contains(p), "pointer does not belong to this allocator");

        let header = ptr::read_unaligned(p.sub(HEADER_SIZE).cast::<AllocationHeader>());
        let block_start = p.sub(header.adjustment);
        let block_size = header.size;
        let block_end = block_start as usize + block_size;
        debug_assert!(block_end <= self.region.end_addr(), "corrupted allocation header");

        // Find the neighbours: `next` is the first free block at or past our end.
        let mut prev: *mut u8 = ptr::null_mut();
        let mut next = self.head.get();
        while !next.is_null() && (next as usize) < block_end {
            prev = next;
            next = read_block(next).next;
        }

        let merged = if prev.is_null() {
            write_block(
                block_start,
                FreeBlock {
                    size: block_size,
                    next,
                },
            );
            self.head.set(block_start);
            block_start
        } else {
            let prev_node = read_block(prev);
            debug_assert!(
                prev as usize + prev_node.size <= block_start as usize,
                "double free or foreign pointer"
            );
            if prev as usize + prev_node.size == block_start as usize {
                write_block(
                    prev,
                    FreeBlock {
                        size: prev_node.size + block_size,
                        next,
                    },
                );
                #[cfg(feature = "tracing")]
                tracing::trace!(size = block_size, "free block merged with predecessor");
                prev
            } else {
                write_block(
                    block_start,
                    FreeBlock {
                        size: block_size,
                        next,
                    },
                );
                self.relink(prev, block_start);
                block_start
            }
        };

        if !next.is_null() && next as usize == block_end {
            let left = read_block(merged);
            let right = read_block(next);
            write_block(
                merged,
                FreeBlock {
                    size: left.size + right.size,
                    next: right.next,
                },
            );
            #[cfg(feature = "tracing")]
            tracing::trace!(size = right.size, "free block merged with successor");
        }

        self.region.usage().on_dealloc(block_size);
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

// Exclusive owner of its region; list pointers never escape it.
unsafe impl<'a> Send for FreeListAllocator<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(64))]
    struct Arena([u8; 1024]);

    #[test]
    fn starts_as_one_block() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
        assert_eq!(list.largest_free_block(), 1024);
    }

    #[test]
    fn splits_front_of_block() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        let p = list.allocate(48, 16).unwrap();
        let offset = p.as_ptr() as usize - list.start().as_ptr() as usize;
        assert_eq!(offset, HEADER_SIZE);
        assert_eq!(list.used_bytes(), 48 + HEADER_SIZE);
        assert_eq!(list.free_blocks(), vec![(64, 1024 - 64)]);

        unsafe { list.deallocate(p) };
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
    }

    #[test]
    fn absorbs_unusable_tail() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        // Leaves exactly HEADER_SIZE bytes behind, which is absorbed.
        let p = list.allocate(1024 - 2 * HEADER_SIZE, 1).unwrap();
        assert_eq!(list.used_bytes(), 1024);
        assert_eq!(list.free_block_count(), 0);
        assert_eq!(list.allocate(1, 1), Err(AllocError));

        unsafe { list.deallocate(p) };
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
        assert_eq!(list.used_bytes(), 0);
    }

    #[test]
    fn absorbs_one_byte_tail() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        // Header (16) + 1007 bytes leaves a single byte behind.
        let p = list.allocate(1024 - HEADER_SIZE - 1, 1).unwrap();
        assert_eq!(list.used_bytes(), 1024);
        assert_eq!(list.free_block_count(), 0);

        unsafe { list.deallocate(p) };
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
    }

    #[test]
    fn splits_smallest_usable_tail() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        // Leaves HEADER_SIZE + 1 bytes: enough for a header and one byte.
        let tail = HEADER_SIZE + 1;
        let p = list.allocate(1024 - HEADER_SIZE - tail, 1).unwrap();
        assert_eq!(list.used_bytes(), 1024 - tail);
        assert_eq!(list.free_blocks(), vec![(1024 - tail, tail)]);

        // The tail serves exactly one byte and is then used up whole.
        let q = list.allocate(1, 1).unwrap();
        assert_eq!(list.used_bytes(), 1024);
        assert_eq!(list.free_block_count(), 0);

        unsafe {
            list.deallocate(q);
            list.deallocate(p);
        }
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
    }

    #[test]
    fn merges_both_neighbours() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        let a = list.allocate(16, 16).unwrap();
        let b = list.allocate(16, 16).unwrap();
        let c = list.allocate(16, 16).unwrap();
        let d = list.allocate(16, 16).unwrap();

        unsafe {
            list.deallocate(a);
            list.deallocate(c);
            assert_eq!(list.free_block_count(), 3);
            // `b` sits between two free blocks.
            list.deallocate(b);
            assert_eq!(list.free_blocks(), vec![(0, 96), (128, 1024 - 128)]);
            list.deallocate(d);
        }
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
        assert_eq!(list.live_allocations(), 0);
    }

    #[test]
    fn first_fit_takes_lowest_sufficient_block() {
        let mut arena = Arena([0; 1024]);
        let list = FreeListAllocator::new(&mut arena.0);

        // Holes of 96, 48 and 192 bytes separated by live 32-byte guards.
        let hole_a = list.allocate(80, 16).unwrap();
        let guard_a = list.allocate(16, 16).unwrap();
        let hole_b = list.allocate(32, 16).unwrap();
        let guard_b = list.allocate(16, 16).unwrap();
        let hole_c = list.allocate(176, 16).unwrap();
        let guard_c = list.allocate(16, 16).unwrap();

        unsafe {
            list.deallocate(hole_a);
            list.deallocate(hole_b);
            list.deallocate(hole_c);
        }
        assert_eq!(
            list.free_blocks(),
            vec![(0, 96), (128, 48), (208, 192), (432, 592)]
        );

        // Fits every hole; best fit would take offset 128, worst fit 432.
        let p = list.allocate(32, 16).unwrap();
        assert_eq!(p.as_ptr() as usize - list.start().as_ptr() as usize, HEADER_SIZE);
        assert_eq!(
            list.free_blocks(),
            vec![(48, 48), (128, 48), (208, 192), (432, 592)]
        );

        unsafe {
            list.deallocate(p);
            list.deallocate(guard_a);
            list.deallocate(guard_b);
            list.deallocate(guard_c);
        }
        assert_eq!(list.free_blocks(), vec![(0, 1024)]);
    }

    #[test]
    #[should_panic(expected = "cannot hold a free-list node")]
    fn tiny_region_is_rejected() {
        let mut buf = [0u8; 8];
        let _ = FreeListAllocator::new(&mut buf);
    }
}
