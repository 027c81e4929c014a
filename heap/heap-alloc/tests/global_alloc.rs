//! The locked `GlobalAlloc` wrapper: lazy initialization, alignment
//! handling, zeroing, and behavior on an undersized region.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use heap_alloc::LockedAllocator;

static ALLOCATOR: LockedAllocator<{ 128 * 1024 }> = LockedAllocator::new();

/// Assert the given alignment of a pointer.
macro_rules! assert_alignment {
    ($ptr:expr, $align:expr) => {{
        assert_eq!(($ptr as usize) % $align, 0, "alignment not fulfilled");
    }};
}

#[test]
fn default_alignments_come_for_free() {
    unsafe {
        let layout = Layout::from_size_align(24, 4).unwrap();
        let p = ALLOCATOR.alloc(layout);
        assert!(!p.is_null());
        assert_alignment!(p, 8);
        ALLOCATOR.dealloc(p, layout);

        let layout = Layout::from_size_align(3, 1).unwrap();
        let p = ALLOCATOR.alloc(layout);
        assert!(!p.is_null());
        assert_alignment!(p, 8);
        ALLOCATOR.dealloc(p, layout);
    }
}

#[test]
fn large_alignments_are_served() {
    for align in [16_usize, 32, 64, 4096] {
        unsafe {
            let layout = Layout::from_size_align(40, align).unwrap();
            let p = ALLOCATOR.alloc(layout);
            assert!(!p.is_null(), "align {align}");
            assert_alignment!(p, align);
            p.write_bytes(0xAB, 40);
            assert_eq!(p.read(), 0xAB);
            assert_eq!(p.add(39).read(), 0xAB);
            ALLOCATOR.dealloc(p, layout);
        }
    }
}

#[test]
fn alloc_zeroed_zeroes_the_payload() {
    unsafe {
        let layout = Layout::from_size_align(96, 8).unwrap();
        // Dirty a block first so reuse would show through.
        let p = ALLOCATOR.alloc(layout);
        assert!(!p.is_null());
        p.write_bytes(0xFF, 96);
        ALLOCATOR.dealloc(p, layout);

        let q = ALLOCATOR.alloc_zeroed(layout);
        assert!(!q.is_null());
        for i in 0..96 {
            assert_eq!(q.add(i).read(), 0, "byte {i} not zeroed");
        }
        ALLOCATOR.dealloc(q, layout);
    }
}

#[test]
fn example_usage() {
    // Mixed sizes, alignments, and an out-of-order deallocation.
    unsafe {
        let layout1 = Layout::new::<u32>();
        let ptr1 = ALLOCATOR.alloc(layout1);
        assert_ne!(ptr1, ptr::null_mut());

        let layout2 = Layout::new::<f64>();
        let ptr2 = ALLOCATOR.alloc(layout2);
        assert_ne!(ptr2, ptr::null_mut());

        let layout3 = Layout::new::<[u16; 12]>();
        let ptr3 = ALLOCATOR.alloc(layout3);
        assert_ne!(ptr3, ptr::null_mut());

        ALLOCATOR.dealloc(ptr2, layout2);

        let layout4 = Layout::new::<u128>();
        let ptr4 = ALLOCATOR.alloc(layout4);
        assert_ne!(ptr4, ptr::null_mut());
        assert_alignment!(ptr4, align_of::<u128>());

        ALLOCATOR.dealloc(ptr3, layout3);
        ALLOCATOR.dealloc(ptr4, layout4);
        ALLOCATOR.dealloc(ptr1, layout1);
    }
}

#[test]
fn undersized_region_always_returns_null() {
    // Too small for the sentinels plus the initial chunk: initialization
    // can never complete, and every allocation fails cleanly.
    static SMALL: LockedAllocator<1024> = LockedAllocator::new();
    unsafe {
        let layout = Layout::from_size_align(16, 8).unwrap();
        assert!(SMALL.alloc(layout).is_null());
        assert!(SMALL.alloc(layout).is_null());
        SMALL.dealloc(ptr::null_mut(), layout);
    }
}
