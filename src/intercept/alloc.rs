//! Global allocator interception
//!
//! Install [`RtsanAllocator`] as the global allocator to catch every heap
//! allocation and deallocation performed inside a real-time context,
//! including those hidden inside `Vec`, `String`, `Box` and friends:
//!
//! ```no_run
//! #[global_allocator]
//! static ALLOC: rtsan::RtsanAllocator = rtsan::RtsanAllocator::system();
//!
//! fn main() {}
//! ```
//!
//! A custom allocator can be wrapped with [`RtsanAllocator::new`].

use super::{intercepted_call, symbols};
use std::alloc::{GlobalAlloc, Layout, System};

/// Alignment the platform `malloc` guarantees without `aligned_alloc`
const MALLOC_ALIGN: usize = std::mem::align_of::<libc::max_align_t>();

/// Allocator wrapper reporting allocation in real-time contexts
#[derive(Debug, Default, Clone, Copy)]
pub struct RtsanAllocator<A = System> {
    inner: A,
}

impl RtsanAllocator<System> {
    /// Wrap the system allocator
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A> RtsanAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[inline(always)]
fn alloc_symbol(layout: Layout) -> &'static str {
    if layout.align() > MALLOC_ALIGN {
        symbols::ALIGNED_ALLOC
    } else {
        symbols::MALLOC
    }
}

// SAFETY: every method forwards to the wrapped allocator with the caller's
// arguments unchanged; the check before it neither allocates nor unwinds.
unsafe impl<A: GlobalAlloc> GlobalAlloc for RtsanAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        intercepted_call(alloc_symbol(layout));
        // SAFETY: caller upholds GlobalAlloc::alloc's contract
        unsafe { self.inner.alloc(layout) }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        intercepted_call(symbols::CALLOC);
        // SAFETY: caller upholds GlobalAlloc::alloc_zeroed's contract
        unsafe { self.inner.alloc_zeroed(layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        intercepted_call(symbols::FREE);
        // SAFETY: caller upholds GlobalAlloc::dealloc's contract
        unsafe { self.inner.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        intercepted_call(symbols::REALLOC);
        // SAFETY: caller upholds GlobalAlloc::realloc's contract
        unsafe { self.inner.realloc(ptr, layout, new_size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ScopedDisabler, ScopedRealtime};

    #[test]
    fn test_symbol_for_layout() {
        assert_eq!(alloc_symbol(Layout::from_size_align(64, 8).unwrap()), "malloc");
        assert_eq!(alloc_symbol(Layout::from_size_align(64, 4096).unwrap()), "aligned_alloc");
    }

    #[test]
    fn test_allocates_outside_realtime() {
        let allocator = RtsanAllocator::system();
        let layout = Layout::from_size_align(128, 16).unwrap();
        unsafe {
            let ptr = allocator.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            assert_eq!(*ptr, 0);
            let ptr = allocator.realloc(ptr, layout, 256);
            assert!(!ptr.is_null());
            allocator.dealloc(ptr, Layout::from_size_align(256, 16).unwrap());
        }
    }

    #[test]
    fn test_allocates_inside_disabled_scope() {
        let allocator = RtsanAllocator::system();
        let layout = Layout::from_size_align(32, 8).unwrap();
        let _rt = ScopedRealtime::new();
        let _off = ScopedDisabler::new();
        unsafe {
            let ptr = allocator.alloc(layout);
            assert!(!ptr.is_null());
            allocator.dealloc(ptr, layout);
        }
    }

    #[test]
    fn test_wraps_custom_allocator() {
        let allocator = RtsanAllocator::new(System);
        let layout = Layout::new::<u64>();
        unsafe {
            let ptr = allocator.alloc(layout);
            assert!(!ptr.is_null());
            allocator.inner().dealloc(ptr, layout);
        }
    }
}
