//! Direct OS reservations for backing memory.
//!
//! Each platform exposes the same two functions, `allocate_region` and
//! `free_region`. Sizes are rounded up to whole pages by the kernel; callers
//! pass the exact size back to `free_region`.

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
pub use windows::*;

/// The system page size assumed for default alignment (4KB).
pub const PAGE_SIZE: usize = 4096;
