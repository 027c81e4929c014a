use crate::allocator::SegListAllocator;
use crate::tag::DSIZE;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, null_mut};
use heap_region::FixedRegion;
use spin::Mutex;

/// Lock-serialized singleton wrapper: a [`SegListAllocator`] over an inline
/// [`FixedRegion`], usable as the `#[global_allocator]`.
///
/// The heap is laid out lazily on the first allocation, so construction is
/// `const` and the value can live in a `static`. A `static` is also where it
/// must live: the region is stored inline and the heap holds absolute
/// pointers into it.
///
/// ```no_run
/// #[global_allocator]
/// static ALLOCATOR: heap_alloc::LockedAllocator<{ 64 * 1024 }> =
///     heap_alloc::LockedAllocator::new();
/// ```
///
/// The allocator itself aligns payloads to 8 bytes. Layouts asking for more
/// are served by over-allocating and stashing the real payload pointer in
/// the word right below the aligned address, where `dealloc` recovers it.
pub struct LockedAllocator<const N: usize> {
    inner: Mutex<SegListAllocator<FixedRegion<N>>>,
}

impl<const N: usize> LockedAllocator<N> {
    /// Create the wrapper; no heap bytes are touched until first use.
    #[must_use = "assign to a static and mark it #[global_allocator]"]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(SegListAllocator::new(FixedRegion::new())),
        }
    }

    /// Run `f` on the locked allocator, initializing it on first use.
    ///
    /// A failed initialization (the region cannot hold the sentinels plus
    /// one chunk) leaves the allocator uninitialized, and every allocation
    /// returns null.
    fn with<T>(&self, f: impl FnOnce(&mut SegListAllocator<FixedRegion<N>>) -> T) -> T {
        let mut heap = self.inner.lock();
        if !heap.is_initialized() {
            // SAFETY: the wrapper lives in a static, so the allocator and
            // its inline region sit at a stable address; `init` is guarded
            // by the lock and its own idempotence.
            let _ = unsafe { heap.init() };
        }
        f(&mut heap)
    }
}

impl<const N: usize> Default for LockedAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the inner allocator hands out non-overlapping live blocks, frees
// make them reusable, and the spin lock serializes all access. Alignment
// above 8 is honored through over-allocation.
unsafe impl<const N: usize> GlobalAlloc for LockedAllocator<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let align = layout.align();
        if align <= DSIZE {
            return self.with(|heap| heap.allocate(layout.size()));
        }
        // Worst-case padding keeps the aligned payload inside the block,
        // with at least one pointer-sized word below it for the stash.
        let Some(size) = layout.size().checked_add(align) else {
            return null_mut();
        };
        let payload = self.with(|heap| heap.allocate(size));
        if payload.is_null() {
            return null_mut();
        }
        let payload_addr = payload as usize;
        let aligned_addr = (payload_addr + size_of::<*mut u8>() + align - 1) & !(align - 1);
        unsafe {
            let aligned = payload.add(aligned_addr - payload_addr);
            aligned.cast::<*mut u8>().sub(1).write(payload);
            aligned
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if ptr.is_null() {
            return;
        }
        let payload = if layout.align() <= DSIZE {
            ptr
        } else {
            unsafe { ptr.cast::<*mut u8>().sub(1).read() }
        };
        self.with(|heap| unsafe { heap.free(payload) });
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let p = unsafe { self.alloc(layout) };
        if !p.is_null() {
            unsafe { ptr::write_bytes(p, 0, layout.size()) };
        }
        p
    }
}
