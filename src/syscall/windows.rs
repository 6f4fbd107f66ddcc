use std::ptr::{self, NonNull};
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

/// Reserves and commits `size` bytes of zeroed, read-write memory.
///
/// Returns `None` if the reservation fails.
///
/// # Safety
/// The caller owns the region and must release it with [`free_region`].
pub unsafe fn allocate_region(size: usize) -> Option<NonNull<u8>> {
    let ptr = VirtualAlloc(ptr::null_mut(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE);
    NonNull::new(ptr.cast::<u8>())
}

/// Releases a region obtained from [`allocate_region`].
///
/// # Safety
/// `ptr` must be the base of a live region from [`allocate_region`].
/// Returns `false` if the release fails.
pub unsafe fn free_region(ptr: NonNull<u8>, _size: usize) -> bool {
    // MEM_RELEASE frees the entire region reserved by VirtualAlloc. Size must be 0.
    VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) != 0
}
