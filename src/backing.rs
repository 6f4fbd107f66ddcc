//! The one upstream reservation that allocators are carved from.
//!
//! A subsystem reserves a [`BackingRegion`] once at startup, splits its
//! bytes between allocators, and releases it at shutdown. The region is an
//! ordinary value threaded through construction; there is no hidden global.
//!
//! ```rust
//! use strata::alloc::{Allocator, LinearAllocator, PoolAllocator};
//! use strata::backing::BackingRegion;
//! use strata::config::{BackingSource, MemoryConfig};
//!
//! let config = MemoryConfig {
//!     backing: BackingSource::Global,
//!     ..MemoryConfig::with_reserve(8192)
//! };
//! let mut backing = BackingRegion::reserve(&config)?;
//! {
//!     let (frame, objects) = backing.as_mut_slice().split_at_mut(4096);
//!     let mut frame = LinearAllocator::new(frame);
//!     let pool = PoolAllocator::new(objects, 64, 16);
//!
//!     let slot = pool.allocate(64, 16)?;
//!     frame.allocate(128, 8)?;
//!     unsafe { pool.deallocate(slot) };
//!     frame.clear();
//! }
//! backing.release();
//! # Ok::<(), strata::Error>(())
//! ```

use core::ptr::NonNull;
use std::alloc::{alloc_zeroed, dealloc, Layout};

use crate::config::{BackingSource, MemoryConfig};
use crate::error::{Error, Result};
use crate::syscall;

/// An owned, zero-initialised block of host memory.
pub struct BackingRegion {
    ptr: NonNull<u8>,
    size: usize,
    source: BackingSource,
    alignment: usize,
}

impl BackingRegion {
    /// Makes the reservation described by `config`.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `config` does not validate, and
    /// `Error::ReserveFailed` if the host refuses the memory.
    pub fn reserve(config: &MemoryConfig) -> Result<Self> {
        config.validate()?;
        let size = config.reserve_bytes;

        let ptr = match config.backing {
            // SAFETY: released in `Drop` with the same size.
            BackingSource::Syscall => unsafe { syscall::allocate_region(size) },
            BackingSource::Global => {
                let layout = Layout::from_size_align(size, config.alignment)
                    .map_err(|e| Error::InvalidConfig(e.to_string()))?;
                // SAFETY: `layout` has a non-zero size (validated above).
                NonNull::new(unsafe { alloc_zeroed(layout) })
            }
        }
        .ok_or(Error::ReserveFailed { bytes: size })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(bytes = size, source = ?config.backing, "backing region reserved");

        Ok(Self {
            ptr,
            size,
            source: config.backing,
            alignment: config.alignment,
        })
    }

    /// Size of the reservation in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the reservation has zero bytes.
    ///
    /// `reserve` rejects zero-sized configurations, so this is `false` for
    /// every region it returns.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Where the memory came from.
    pub fn source(&self) -> BackingSource {
        self.source
    }

    /// First byte of the reservation.
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The whole reservation as bytes, ready to be split between allocators.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: we own `size` initialised (zeroed) bytes at `ptr`, and `&mut self`
        // makes this the only live view.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    /// Returns the memory to the host.
    ///
    /// Equivalent to dropping the region; spelled out for shutdown paths.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for BackingRegion {
    fn drop(&mut self) {
        match self.source {
            BackingSource::Syscall => {
                // SAFETY: `ptr`/`size` came from `allocate_region` and are released once.
                let released = unsafe { syscall::free_region(self.ptr, self.size) };
                debug_assert!(released, "failed to release backing region");
            }
            BackingSource::Global => {
                // SAFETY: same layout as in `reserve`, which already validated it.
                unsafe {
                    let layout = Layout::from_size_align_unchecked(self.size, self.alignment);
                    dealloc(self.ptr.as_ptr(), layout);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(bytes = self.size, source = ?self.source, "backing region released");
    }
}

// The region is plain owned memory.
unsafe impl Send for BackingRegion {}
