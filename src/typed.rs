//! Typed construction and destruction on top of the raw [`Allocator`] calls.
//!
//! [`AllocatorExt`] is implemented for every allocator, including
//! `dyn Allocator`. Arrays carry their element count in a small header just
//! before element 0, so [`AllocatorExt::delete_array`] needs nothing but the
//! pointer to the first element.

use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};

use crate::alloc::{AllocError, Allocator};

/// Number of `T` slots reserved in front of an array to hold its length.
#[inline(always)]
const fn header_elements<T>() -> usize {
    let elem = size_of::<T>();
    assert!(elem != 0, "zero-sized types cannot be placed in a region");
    (size_of::<usize>() + elem - 1) / elem
}

#[inline(always)]
unsafe fn length_slot<T>(first: NonNull<T>) -> *mut usize {
    first.as_ptr().cast::<u8>().sub(size_of::<usize>()).cast::<usize>()
}

/// Typed helpers available on every [`Allocator`].
pub trait AllocatorExt: Allocator {
    /// Moves `value` into freshly allocated memory.
    ///
    /// # Errors
    /// Returns `AllocError` if the allocator is out of space; `value` is
    /// dropped in that case.
    fn new_value<T>(&self, value: T) -> Result<NonNull<T>, AllocError> {
        assert!(size_of::<T>() != 0, "zero-sized types cannot be placed in a region");
        let ptr = self.allocate(size_of::<T>(), align_of::<T>())?.cast::<T>();
        // SAFETY: freshly allocated, sized and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Drops the value in place and returns its memory.
    ///
    /// # Safety
    /// `ptr` must come from [`new_value`](Self::new_value) on this allocator
    /// and must not be used afterwards. The allocator's own ordering rules
    /// apply.
    unsafe fn delete_value<T>(&self, ptr: NonNull<T>) {
        ptr::drop_in_place(ptr.as_ptr());
        self.deallocate(ptr.cast());
    }

    /// Allocates `len` default-initialised elements.
    ///
    /// # Errors
    /// Returns `AllocError` if the array and its length header do not fit.
    fn new_array<T: Default>(&self, len: usize) -> Result<NonNull<[T]>, AllocError> {
        self.new_array_with(len, |_| T::default())
    }

    /// Allocates `len` elements, initialising element `i` with `init(i)`.
    ///
    /// The element count is written just before element 0.
    ///
    /// # Errors
    /// Returns `AllocError` if the array and its length header do not fit.
    fn new_array_with<T, F>(&self, len: usize, mut init: F) -> Result<NonNull<[T]>, AllocError>
    where
        F: FnMut(usize) -> T,
    {
        let header = header_elements::<T>();
        let bytes = len
            .checked_add(header)
            .and_then(|n| n.checked_mul(size_of::<T>()))
            .ok_or(AllocError)?;

        let base = self.allocate(bytes, align_of::<T>())?.cast::<T>();
        // SAFETY: the block holds `header + len` elements of `T`.
        unsafe {
            let first = NonNull::new_unchecked(base.as_ptr().add(header));
            ptr::write_unaligned(length_slot(first), len);
            for i in 0..len {
                first.as_ptr().add(i).write(init(i));
            }
            Ok(NonNull::slice_from_raw_parts(first, len))
        }
    }

    /// Reads the element count stored in front of an array.
    ///
    /// # Safety
    /// `first` must point at element 0 of a live array from
    /// [`new_array_with`](Self::new_array_with).
    unsafe fn array_len<T>(&self, first: NonNull<T>) -> usize {
        ptr::read_unaligned(length_slot(first))
    }

    /// Drops every element of an array and returns its memory.
    ///
    /// # Safety
    /// `first` must point at element 0 of a live array allocated from this
    /// allocator by [`new_array_with`](Self::new_array_with).
    unsafe fn delete_array<T>(&self, first: NonNull<T>) {
        let len = self.array_len(first);
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first.as_ptr(), len));
        let base = first.as_ptr().sub(header_elements::<T>());
        self.deallocate(NonNull::new_unchecked(base).cast());
    }
}

impl<A: Allocator + ?Sized> AllocatorExt for A {}
