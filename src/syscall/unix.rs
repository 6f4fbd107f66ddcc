use libc::{c_void, mmap, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
use std::ptr::{self, NonNull};

/// Maps `size` bytes of zeroed, private, read-write memory.
///
/// Returns `None` if the kernel refuses the mapping.
///
/// # Safety
/// The caller owns the mapping and must release it with [`free_region`].
pub unsafe fn allocate_region(size: usize) -> Option<NonNull<u8>> {
    let ptr = mmap(
        ptr::null_mut(),
        size,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
    );

    if ptr == MAP_FAILED {
        None
    } else {
        NonNull::new(ptr.cast::<u8>())
    }
}

/// Unmaps a region obtained from [`allocate_region`].
///
/// # Safety
/// `ptr` and `size` must describe exactly one live mapping from
/// [`allocate_region`]. Returns `false` if the kernel rejects the call.
pub unsafe fn free_region(ptr: NonNull<u8>, size: usize) -> bool {
    munmap(ptr.as_ptr().cast::<c_void>(), size) == 0
}
