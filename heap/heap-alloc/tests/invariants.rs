//! Randomized operation sequences with the heap checker as oracle: every
//! step must leave the boundary tags, the address-order block chain, and the
//! twelve class lists structurally intact.

use heap_alloc::SegListAllocator;
use heap_region::FixedRegion;

const CAP: usize = 256 * 1024;

#[test]
fn randomized_mixed_lifetimes_uphold_invariants() {
    for seed in [1u64, 7, 42, 0x00C0_FFEE] {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut region = FixedRegion::<CAP>::new();
        let mut heap = SegListAllocator::new(&mut region);
        unsafe { heap.init().expect("init") };

        // Live allocations with their size and fill byte, so frees can
        // verify the payload was never clobbered.
        let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

        for step in 0..1500_u32 {
            let roll = rng.u32(0..100);
            if roll < 55 || live.is_empty() {
                let size = match rng.u32(0..4) {
                    0 => rng.usize(1..=16),
                    1 => rng.usize(17..=128),
                    2 => rng.usize(129..=1024),
                    _ => rng.usize(1025..=4096),
                };
                let p = heap.allocate(size);
                if !p.is_null() {
                    assert_eq!(p as usize % 8, 0, "seed {seed} step {step}");
                    let fill = (step as u8) ^ 0x5A;
                    unsafe { p.write_bytes(fill, size) };
                    live.push((p, size, fill));
                }
            } else if roll < 85 {
                let (p, size, fill) = live.swap_remove(rng.usize(0..live.len()));
                unsafe {
                    for off in [0, size / 2, size - 1] {
                        assert_eq!(
                            p.add(off).read(),
                            fill,
                            "payload clobbered (seed {seed}, step {step})"
                        );
                    }
                    heap.free(p);
                }
            } else {
                let idx = rng.usize(0..live.len());
                let (p, size, fill) = live[idx];
                let new_size = rng.usize(1..=2048);
                let q = unsafe { heap.reallocate(p, new_size) };
                if !q.is_null() {
                    let kept = size.min(new_size);
                    unsafe {
                        assert_eq!(q.read(), fill, "seed {seed} step {step}");
                        assert_eq!(q.add(kept - 1).read(), fill, "seed {seed} step {step}");
                        q.write_bytes(fill, new_size);
                    }
                    live[idx] = (q, new_size, fill);
                }
            }

            let stats = heap
                .check()
                .unwrap_or_else(|e| panic!("invariant violated (seed {seed}, step {step}): {e}"));
            assert!(stats.free_bytes <= stats.heap_bytes);
        }

        for (p, ..) in live.drain(..) {
            unsafe { heap.free(p) };
        }
        let stats = heap.check().expect("final check");
        assert_eq!(
            stats.blocks, 1,
            "freeing everything coalesces to one block (seed {seed})"
        );
        assert_eq!(stats.free_blocks, 1);
    }
}

#[test]
fn lifo_reuse_within_an_exact_class() {
    let mut region = FixedRegion::<CAP>::new();
    let mut heap = SegListAllocator::new(&mut region);
    unsafe { heap.init().expect("init") };

    // Eight exact-class blocks, pinned apart by a live neighbor each.
    let mut blocks = Vec::new();
    for _ in 0..8 {
        let b = heap.allocate(24);
        assert!(!b.is_null());
        assert!(!heap.allocate(24).is_null()); // pin
        blocks.push(b);
    }
    for &b in &blocks {
        unsafe { heap.free(b) };
    }
    heap.check().expect("consistent");

    // LIFO insertion: allocations come back in reverse free order.
    for &expected in blocks.iter().rev() {
        assert_eq!(heap.allocate(24), expected);
    }
    heap.check().expect("consistent");
}

#[test]
fn storage_of_freed_blocks_is_reusable_and_writable() {
    let mut region = FixedRegion::<CAP>::new();
    let mut heap = SegListAllocator::new(&mut region);
    unsafe { heap.init().expect("init") };

    let p = heap.allocate(48);
    assert!(!p.is_null());
    unsafe {
        p.write_bytes(0x11, 48);
        heap.free(p);
    }

    // The replacement block occupying p's bytes is fully usable.
    let q = heap.allocate(48);
    assert_eq!(q, p);
    unsafe {
        q.write_bytes(0x22, 48);
        for i in 0..48 {
            assert_eq!(q.add(i).read(), 0x22);
        }
        heap.free(q);
    }
    heap.check().expect("consistent");
}
