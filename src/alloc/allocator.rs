use core::ptr::NonNull;

/// The allocation contract shared by every region allocator.
///
/// An implementation manages one contiguous region it does not own and hands
/// out sub-ranges of it. Calls take `&self`: bookkeeping lives in `Cell`s, so
/// several [`ProxyAllocator`](crate::alloc::ProxyAllocator)s can front the same
/// allocator, while the types stay `!Sync`.
///
/// On success `used_bytes` and `live_allocations` grow by the
/// implementation's overhead-inclusive cost for the request. Dropping an
/// allocator with anything still live is a programming error and panics.
pub trait Allocator {
    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// `size` must be non-zero and `alignment` a power of two (checked in
    /// debug builds).
    ///
    /// # Errors
    /// Returns `AllocError` if the region cannot satisfy the request. State
    /// is left untouched in that case.
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator (or on
    /// the allocator it forwards to) and must not have been deallocated since.
    /// Individual allocators add their own ordering rules.
    unsafe fn deallocate(&self, ptr: NonNull<u8>);

    /// Total bytes managed by the allocator.
    fn capacity(&self) -> usize;

    /// Bytes currently consumed, headers and alignment padding included.
    fn used_bytes(&self) -> usize;

    /// Number of allocations not yet returned.
    fn live_allocations(&self) -> usize;

    /// First byte of the managed region.
    fn start(&self) -> NonNull<u8>;

    /// Bytes still available before `capacity` is reached.
    fn remaining(&self) -> usize {
        self.capacity() - self.used_bytes()
    }
}

/// The error type for allocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("memory allocation failed")
    }
}

impl std::error::Error for AllocError {}
