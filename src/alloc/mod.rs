//! Region allocators and the contract they share.
//!
//! Every allocator manages one borrowed, contiguous region and never touches
//! the host heap. Pick the discipline that matches the lifetime pattern:
//!
//! | Allocator | Free order | Per-block overhead |
//! |---|---|---|
//! | [`LinearAllocator`] | all at once (`clear`) | alignment padding |
//! | [`StackAllocator`] | reverse allocation order | header + padding |
//! | [`FreeListAllocator`] | any | header + padding |
//! | [`PoolAllocator`] | any, fixed size | none |
//!
//! [`ProxyAllocator`] can front any of them to attribute usage to an owner.

pub mod allocator;
pub mod free_list;
pub mod linear;
pub mod pool;
pub mod proxy;
pub(crate) mod region;
pub mod stack;

pub use allocator::{AllocError, Allocator};
pub use free_list::FreeListAllocator;
pub use linear::LinearAllocator;
pub use pool::PoolAllocator;
pub use proxy::ProxyAllocator;
pub use stack::StackAllocator;
