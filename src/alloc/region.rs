//! Shared bookkeeping for every allocator: the managed span and its usage
//! counters.

use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Usage counters with a zero-residue check on drop.
///
/// Dropping a `Usage` that still records bytes or live allocations means the
/// owner leaked, and panics. The check is skipped while the thread is already
/// unwinding so a failing test does not escalate into an abort.
#[derive(Debug, Default)]
pub(crate) struct Usage {
    used: Cell<usize>,
    live: Cell<usize>,
}

impl Usage {
    pub(crate) const fn new() -> Self {
        Self {
            used: Cell::new(0),
            live: Cell::new(0),
        }
    }

    #[inline(always)]
    pub(crate) fn used(&self) -> usize {
        self.used.get()
    }

    #[inline(always)]
    pub(crate) fn live(&self) -> usize {
        self.live.get()
    }

    #[inline(always)]
    pub(crate) fn on_alloc(&self, bytes: usize) {
        self.used.set(self.used.get() + bytes);
        self.live.set(self.live.get() + 1);
    }

    #[inline(always)]
    pub(crate) fn on_dealloc(&self, bytes: usize) {
        debug_assert!(self.live.get() > 0, "deallocation without a live allocation");
        debug_assert!(bytes <= self.used.get(), "deallocation larger than recorded usage");
        self.used.set(self.used.get() - bytes);
        self.live.set(self.live.get() - 1);
    }

    pub(crate) fn reset(&self) {
        self.used.set(0);
        self.live.set(0);
    }
}

impl Drop for Usage {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        assert!(
            self.live.get() == 0 && self.used.get() == 0,
            "allocator dropped with {} live allocation(s) holding {} byte(s)",
            self.live.get(),
            self.used.get(),
        );
    }
}

/// A borrowed span of memory plus its usage counters.
///
/// The region never frees the span; it belongs to whoever reserved it and
/// must outlive `'a`.
#[derive(Debug)]
pub(crate) struct Region<'a> {
    start: NonNull<u8>,
    size: usize,
    usage: Usage,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> Region<'a> {
    pub(crate) fn new(memory: &'a mut [u8]) -> Self {
        let size = memory.len();
        // SAFETY: a slice pointer is never null, and the borrow covers `size` bytes.
        unsafe { Self::from_raw_parts(NonNull::new_unchecked(memory.as_mut_ptr()), size) }
    }

    /// # Safety
    /// `start..start + size` must be valid for reads and writes for `'a` and
    /// not accessed through any other path while the region is alive.
    pub(crate) unsafe fn from_raw_parts(start: NonNull<u8>, size: usize) -> Self {
        assert!(size > 0, "an allocator needs a non-empty region");
        Self {
            start,
            size,
            usage: Usage::new(),
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn start(&self) -> NonNull<u8> {
        self.start
    }

    #[inline(always)]
    pub(crate) fn start_addr(&self) -> usize {
        self.start.as_ptr() as usize
    }

    #[inline(always)]
    pub(crate) fn end_addr(&self) -> usize {
        self.start_addr() + self.size
    }

    #[inline(always)]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub(crate) fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Whether `ptr` points inside the managed span.
    #[inline(always)]
    pub(crate) fn contains(&self, ptr: *const u8) -> bool {
        let p = ptr as usize;
        p >= self.start_addr() && p < self.end_addr()
    }

    /// Pointer to `addr`, derived from the region start so it keeps the
    /// region's provenance.
    ///
    /// # Safety
    /// `addr` must lie within `start..=end`.
    #[inline(always)]
    pub(crate) unsafe fn ptr_at(&self, addr: usize) -> *mut u8 {
        debug_assert!(addr >= self.start_addr() && addr <= self.end_addr());
        self.start.as_ptr().add(addr - self.start_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_tracks_counters() {
        let usage = Usage::new();
        usage.on_alloc(32);
        usage.on_alloc(8);
        assert_eq!(usage.used(), 40);
        assert_eq!(usage.live(), 2);
        usage.on_dealloc(32);
        usage.on_dealloc(8);
        assert_eq!(usage.used(), 0);
        assert_eq!(usage.live(), 0);
    }

    #[test]
    #[should_panic(expected = "live allocation")]
    fn usage_panics_on_leak() {
        let usage = Usage::new();
        usage.on_alloc(16);
        drop(usage);
    }

    #[test]
    fn region_bounds() {
        let mut buf = [0u8; 32];
        let region = Region::new(&mut buf);
        let start = region.start().as_ptr();
        assert_eq!(region.size(), 32);
        assert!(region.contains(start));
        assert!(region.contains(unsafe { start.add(31) }));
        assert!(!region.contains(unsafe { start.add(32) }));
    }

    #[test]
    #[should_panic(expected = "non-empty region")]
    fn empty_region_is_rejected() {
        let mut buf: [u8; 0] = [];
        let _ = Region::new(&mut buf);
    }
}
