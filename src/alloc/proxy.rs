//! `ProxyAllocator`: transparent usage accounting in front of another
//! allocator.

use core::ptr::NonNull;

use crate::alloc::allocator::{AllocError, Allocator};
use crate::alloc::region::Usage;

/// Forwards every call to a wrapped allocator and keeps its own counters.
///
/// The proxy's `used_bytes` moves by the *change* in the wrapped allocator's
/// usage, so headers and padding it adds are attributed to whoever allocated
/// through this proxy. Several proxies may wrap the same allocator to split
/// one arena's usage between logical owners.
///
/// ```rust
/// use strata::alloc::{Allocator, FreeListAllocator, ProxyAllocator};
///
/// let mut memory = [0u8; 1024];
/// let heap = FreeListAllocator::new(&mut memory);
/// let audio = ProxyAllocator::new(&heap);
/// let physics = ProxyAllocator::new(&heap);
///
/// let a = audio.allocate(64, 8).unwrap();
/// let b = physics.allocate(16, 8).unwrap();
/// assert_eq!(audio.used_bytes() + physics.used_bytes(), heap.used_bytes());
///
/// unsafe {
///     physics.deallocate(b);
///     audio.deallocate(a);
/// }
/// ```
pub struct ProxyAllocator<'a> {
    inner: &'a dyn Allocator,
    usage: Usage,
}

impl<'a> ProxyAllocator<'a> {
    /// Wraps `inner` without allocating anything.
    pub fn new(inner: &'a dyn Allocator) -> Self {
        Self {
            inner,
            usage: Usage::new(),
        }
    }

    /// The allocator this proxy forwards to.
    pub fn inner(&self) -> &'a dyn Allocator {
        self.inner
    }

    /// Stops tracking every allocation made through this proxy.
    ///
    /// For allocators that are reclaimed in bulk, such as
    /// [`LinearAllocator`](crate::alloc::LinearAllocator): release the proxy's
    /// counters, drop the proxy, then reset the wrapped allocator. The
    /// wrapped allocator is not touched and still owns the memory.
    pub fn release_all(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            used = self.usage.used(),
            live = self.usage.live(),
            "proxy counters released"
        );
        self.usage.reset();
    }
}

impl<'a> Allocator for ProxyAllocator<'a> {
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(size != 0, "zero-sized allocation");

        let before = self.inner.used_bytes();
        let ptr = self.inner.allocate(size, alignment)?;
        self.usage.on_alloc(self.inner.used_bytes() - before);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let before = self.inner.used_bytes();
        self.inner.deallocate(ptr);
        self.usage.on_dealloc(before - self.inner.used_bytes());
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn used_bytes(&self) -> usize {
        self.usage.used()
    }

    fn live_allocations(&self) -> usize {
        self.usage.live()
    }

    fn start(&self) -> NonNull<u8> {
        self.inner.start()
    }

    /// What is left in the wrapped allocator, shared by all its users.
    fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{LinearAllocator, PoolAllocator, StackAllocator};

    #[repr(C, align(64))]
    struct Arena([u8; 512]);

    #[test]
    fn counts_wrapped_overhead() {
        let mut arena = Arena([0; 512]);
        let stack = StackAllocator::new(&mut arena.0);
        let proxy = ProxyAllocator::new(&stack);

        let p = proxy.allocate(10, 8).unwrap();
        assert_eq!(proxy.used_bytes(), stack.used_bytes());
        assert!(proxy.used_bytes() > 10);
        assert_eq!(proxy.live_allocations(), 1);
        assert_eq!(proxy.capacity(), 512);
        assert_eq!(proxy.start(), stack.start());

        unsafe { proxy.deallocate(p) };
        assert_eq!(proxy.used_bytes(), 0);
        assert_eq!(stack.used_bytes(), 0);
    }

    #[test]
    fn failure_is_not_counted() {
        let mut arena = Arena([0; 512]);
        let pool = PoolAllocator::new(&mut arena.0, 256, 64);
        let proxy = ProxyAllocator::new(&pool);

        let a = proxy.allocate(256, 64).unwrap();
        let b = proxy.allocate(256, 64).unwrap();
        assert_eq!(proxy.allocate(256, 64), Err(AllocError));
        assert_eq!(proxy.live_allocations(), 2);
        assert_eq!(proxy.used_bytes(), 512);

        unsafe {
            proxy.deallocate(a);
            proxy.deallocate(b);
        }
    }

    #[test]
    fn release_all_lets_a_linear_proxy_drop() {
        let mut arena = Arena([0; 512]);
        let mut linear = LinearAllocator::new(&mut arena.0);
        {
            let mut proxy = ProxyAllocator::new(&linear);
            proxy.allocate(16, 8).unwrap();
            proxy.allocate(40, 8).unwrap();
            assert_eq!(proxy.live_allocations(), 2);

            proxy.release_all();
            assert_eq!(proxy.used_bytes(), 0);
            assert_eq!(proxy.live_allocations(), 0);
            // The wrapped allocator still owns the memory until it is cleared.
            assert_eq!(linear.live_allocations(), 2);
        }
        linear.clear();
        assert_eq!(linear.used_bytes(), 0);
    }

    #[test]
    #[should_panic(expected = "1 live allocation")]
    fn linear_proxy_without_release_is_fatal() {
        let mut arena = Arena([0; 512]);
        let mut linear = LinearAllocator::new(&mut arena.0);
        {
            let proxy = ProxyAllocator::new(&linear);
            proxy.allocate(16, 8).unwrap();
        }
        linear.clear();
    }

    #[test]
    fn proxies_nest() {
        let mut arena = Arena([0; 512]);
        let stack = StackAllocator::new(&mut arena.0);
        let outer = ProxyAllocator::new(&stack);
        let inner = ProxyAllocator::new(&outer);

        let p = inner.allocate(32, 16).unwrap();
        assert_eq!(inner.used_bytes(), outer.used_bytes());
        assert_eq!(outer.used_bytes(), stack.used_bytes());
        unsafe { inner.deallocate(p) };
        assert_eq!(outer.live_allocations(), 0);
    }
}
