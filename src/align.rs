//! Forward-alignment arithmetic shared by every allocator.
//!
//! All functions operate on raw addresses (`usize`) so they stay `const` and
//! branch-light. `alignment` must be a non-zero power of two; this is checked
//! in debug builds only.

/// Returns `true` if `alignment` is a non-zero power of two.
#[inline(always)]
pub const fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two()
}

/// Returns `true` if `address` is a multiple of `alignment`.
#[inline(always)]
pub const fn is_aligned(address: usize, alignment: usize) -> bool {
    debug_assert!(is_valid_alignment(alignment));
    address & (alignment - 1) == 0
}

/// Rounds `address` up to the next multiple of `alignment`.
#[inline(always)]
pub const fn align_forward(address: usize, alignment: usize) -> usize {
    debug_assert!(is_valid_alignment(alignment));
    (address + (alignment - 1)) & !(alignment - 1)
}

/// Number of bytes to add to `address` to make it a multiple of `alignment`.
///
/// Already-aligned addresses yield `0`, never a full `alignment`.
#[inline(always)]
pub const fn align_forward_adjustment(address: usize, alignment: usize) -> usize {
    debug_assert!(is_valid_alignment(alignment));
    let misalignment = address & (alignment - 1);
    if misalignment == 0 {
        0
    } else {
        alignment - misalignment
    }
}

/// Like [`align_forward_adjustment`], but the result always leaves at least
/// `header_size` bytes between `address` and the aligned address.
///
/// When the plain adjustment is too small for the header it grows by whole
/// multiples of `alignment`, so the aligned address stays aligned.
#[inline(always)]
pub const fn align_forward_adjustment_with_header(
    address: usize,
    alignment: usize,
    header_size: usize,
) -> usize {
    let mut adjustment = align_forward_adjustment(address, alignment);

    if adjustment < header_size {
        let needed = header_size - adjustment;
        adjustment += alignment * (needed / alignment);
        if needed % alignment > 0 {
            adjustment += alignment;
        }
    }

    adjustment
}

/// Pointer flavour of [`align_forward`] that keeps the provenance of `ptr`.
///
/// # Safety
/// The aligned pointer must stay within the allocation `ptr` points into.
#[inline(always)]
pub unsafe fn align_forward_ptr(ptr: *mut u8, alignment: usize) -> *mut u8 {
    ptr.add(align_forward_adjustment(ptr as usize, alignment))
}
