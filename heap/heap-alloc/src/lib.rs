//! # Segregated Free-List Heap Allocator
//!
//! A dynamic memory allocator over a single contiguous, monotonically
//! growing heap obtained from a [`heap_region::RegionProvider`]. It exposes
//! the classic trio of [`allocate`](SegListAllocator::allocate),
//! [`free`](SegListAllocator::free), and
//! [`reallocate`](SegListAllocator::reallocate) for client code that wants
//! explicit control over an arena's lifetime, plus a locked
//! [`GlobalAlloc`](core::alloc::GlobalAlloc) wrapper
//! ([`LockedAllocator`]) for use as the global allocator.
//!
//! ## Design outline
//!
//! - **Boundary tags**: every block carries a 4-byte header and an identical
//!   footer packing `(size | alloc)` ([`BoundaryTag`]), giving O(1)
//!   navigation to both physical neighbors.
//! - **Sentinels**: a permanently allocated 8-byte prologue and a zero-size
//!   epilogue header frame the heap, so coalescing needs no edge cases.
//! - **Segregated free lists**: free blocks sit on one of twelve
//!   size-class lists: four exact classes for the small sizes that dominate
//!   mixed workloads, then doubling ranges up to an open-ended top class.
//!   Search is first-fit within a class, ascending across classes.
//! - **Immediate coalescing**: freeing merges with free neighbors on the
//!   spot; no two adjacent blocks are ever both free.
//! - **Splitting**: a chosen block is split when the tail can stand alone as
//!   a block of at least [`MIN_BLOCK_SIZE`] bytes.
//!
//! A block in memory, with the payload pointer as the external handle:
//!
//! ```text
//! +--------+----------------------------------+--------+
//! | header |             payload              | footer |
//! | size|a |  (free: next/prev class links)   | size|a |
//! +--------+----------------------------------+--------+
//! 4 bytes   ^ returned pointer, 8-aligned      4 bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use heap_alloc::SegListAllocator;
//! use heap_region::FixedRegion;
//!
//! let mut region = FixedRegion::<{ 64 * 1024 }>::new();
//! let mut heap = SegListAllocator::new(&mut region);
//! unsafe {
//!     heap.init().expect("region holds the initial chunk");
//!     let p = heap.allocate(100);
//!     assert!(!p.is_null());
//!     heap.free(p);
//! }
//! ```
//!
//! Verification of the structural invariants is available through
//! [`check`](SegListAllocator::check), and [`dump`](SegListAllocator::dump)
//! logs the heap layout.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod allocator;
mod block;
mod check;
mod global;
mod seglist;
mod tag;

pub use allocator::{HeapError, SegListAllocator};
pub use block::{CHUNK_SIZE, MIN_BLOCK_SIZE, align_up};
pub use check::{CheckError, HeapStats};
pub use global::LockedAllocator;
pub use seglist::NUM_CLASSES;
pub use tag::{BoundaryTag, DSIZE, WSIZE};
