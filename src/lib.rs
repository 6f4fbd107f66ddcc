//! # `strata` - Region Allocators for Latency-Sensitive Loops
//!
//! A family of allocators that each manage one contiguous, pre-reserved
//! region and never fall back to the host heap. They give real-time code
//! (simulation steps, game frames, audio callbacks) allocation with flat,
//! predictable latency and no long-run fragmentation surprises.
//!
//! ## Allocation Disciplines
//!
//! - **Linear** ([`LinearAllocator`]): bump a cursor, free everything at once.
//! - **Stack** ([`StackAllocator`]): LIFO frees, one small header per block.
//! - **Free list** ([`FreeListAllocator`]): free in any order; first fit with
//!   coalescing of neighbouring free blocks.
//! - **Pool** ([`PoolAllocator`]): fixed-size slots, O(1) both ways, no
//!   per-block overhead.
//! - **Proxy** ([`ProxyAllocator`]): forwards to another allocator and
//!   tracks usage for one logical owner.
//!
//! All of them implement the object-safe [`Allocator`] trait, so owners can
//! hold a `&dyn Allocator` and layer proxies freely. [`AllocatorExt`] adds
//! typed construction on top.
//!
//! ## Failure Model
//!
//! - Running out of space is ordinary: `allocate` returns `Err(AllocError)`
//!   and leaves the allocator unchanged.
//! - Misuse panics: zero-sized requests, bad alignments, freeing a stack
//!   block out of order, and dropping an allocator with live allocations.
//!   Hot-path checks are `debug_assert!`s and vanish in release builds.
//!
//! ## Threading
//!
//! Allocators are single-threaded. Their state lives in `Cell`s, so they are
//! `!Sync`; give each thread its own allocator over a disjoint region.
//!
//! ## Example
//!
//! ```rust
//! use strata::{Allocator, AllocatorExt, StackAllocator};
//!
//! let mut scratch = [0u8; 1024];
//! let stack = StackAllocator::new(&mut scratch);
//!
//! let a = stack.new_value([1.0f32; 4]).unwrap();
//! let b = stack.new_array::<u32>(16).unwrap();
//!
//! unsafe {
//!     stack.delete_array(b.cast::<u32>());
//!     stack.delete_value(a);
//! }
//! assert_eq!(stack.used_bytes(), 0);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod align;
pub mod alloc;
pub mod backing;
pub mod config;
pub mod error;
pub mod syscall;
pub mod typed;

pub use alloc::{
    AllocError, Allocator, FreeListAllocator, LinearAllocator, PoolAllocator, ProxyAllocator,
    StackAllocator,
};
pub use backing::BackingRegion;
pub use config::{BackingSource, MemoryConfig};
pub use error::{Error, Result};
pub use typed::AllocatorExt;

// Compile-time assertions for the layout claims the allocators rely on.
const _: () = {
    use core::mem;

    // Pool slots store one pointer while free.
    assert!(mem::size_of::<*mut u8>() == mem::size_of::<usize>());

    // Allocators carry no hidden heap state: a handful of words each.
    assert!(mem::size_of::<LinearAllocator<'static>>() <= mem::size_of::<usize>() * 5);
    assert!(mem::size_of::<PoolAllocator<'static>>() <= mem::size_of::<usize>() * 9);
    assert!(mem::size_of::<ProxyAllocator<'static>>() <= mem::size_of::<usize>() * 4);
};
