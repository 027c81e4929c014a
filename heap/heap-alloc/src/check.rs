//! Heap consistency checking and diagnostics.
//!
//! [`check`](SegListAllocator::check) walks the heap in address order and
//! every size-class list, verifying the structural invariants the allocator
//! maintains between calls. It is the oracle behind the randomized tests and
//! a debugging aid; [`dump`](SegListAllocator::dump) reports the same walk
//! through `log`.

use crate::allocator::SegListAllocator;
use crate::block::{Block, MIN_BLOCK_SIZE};
use crate::seglist::{NUM_CLASSES, class_of};
use crate::tag::{DSIZE, WSIZE};
use heap_region::RegionProvider;
use log::info;

/// Totals gathered by a successful [`check`](SegListAllocator::check) walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Blocks between the sentinels.
    pub blocks: usize,
    /// Free blocks among them.
    pub free_blocks: usize,
    /// Bytes held in free blocks, boundary tags included.
    pub free_bytes: usize,
    /// Total heap footprint in bytes, sentinels and pad included.
    pub heap_bytes: usize,
    /// Free blocks per size class.
    pub classes: [usize; NUM_CLASSES],
}

/// A violated heap invariant, found by [`check`](SegListAllocator::check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// The allocator has not been initialized.
    #[error("heap not initialized")]
    Uninitialized,
    /// The prologue sentinel is damaged.
    #[error("bad prologue sentinel")]
    BadPrologue,
    /// The epilogue sentinel is damaged.
    #[error("bad epilogue sentinel at {addr:#x}")]
    BadEpilogue { addr: usize },
    /// Header and footer of a block disagree.
    #[error("tag mismatch at {addr:#x}: header {header:#010x}, footer {footer:#010x}")]
    TagMismatch { addr: usize, header: u32, footer: u32 },
    /// A block's size is not a legal block size.
    #[error("bad block size {size} at {addr:#x}")]
    BadSize { addr: usize, size: usize },
    /// A payload pointer is not 8-aligned.
    #[error("misaligned payload at {addr:#x}")]
    Misaligned { addr: usize },
    /// Two blocks adjacent in address order are both free.
    #[error("adjacent free blocks at {addr:#x} and {next:#x}")]
    AdjacentFree { addr: usize, next: usize },
    /// A free block is absent from the list for its size class.
    #[error("free block at {addr:#x} missing from class {class} list")]
    NotOnList { addr: usize, class: usize },
    /// A listed block is not marked free.
    #[error("allocated block at {addr:#x} on class {class} list")]
    AllocatedOnList { addr: usize, class: usize },
    /// A listed block's size maps to a different class.
    #[error("block of size {size} at {addr:#x} on class {class} list")]
    WrongClass { addr: usize, size: usize, class: usize },
    /// Forward and backward links of a list disagree.
    #[error("broken links at {addr:#x} in class {class} list")]
    BrokenLinks { addr: usize, class: usize },
    /// The lists hold more entries than there are free blocks.
    #[error("class lists hold {listed} blocks, heap has {walked} free")]
    ListCountMismatch { listed: usize, walked: usize },
}

impl<R: RegionProvider> SegListAllocator<R> {
    /// Verify every structural invariant of the heap and return totals.
    ///
    /// Checked per block: header/footer agreement, legal 8-multiple size, at
    /// least [`MIN_BLOCK_SIZE`], 8-aligned payload, and no free neighbor
    /// pair. Checked per list: entries are free, on the list matching their
    /// size, with forward/backward links that are inverses; the list
    /// population matches the free blocks seen in the address walk. The
    /// sentinels must read `(8, allocated)` and `(0, allocated)`.
    ///
    /// # Errors
    /// The first violated invariant, with the offending address.
    pub fn check(&self) -> Result<HeapStats, CheckError> {
        if !self.is_initialized() {
            return Err(CheckError::Uninitialized);
        }
        let mut stats = HeapStats::default();

        unsafe {
            let prologue = Block::from_payload(self.prologue());
            if prologue.header().size() != DSIZE
                || !prologue.header().allocated()
                || prologue.footer().size() != DSIZE
                || !prologue.footer().allocated()
            {
                return Err(CheckError::BadPrologue);
            }

            // Address-order walk from the first real block to the epilogue.
            stats.heap_bytes = 2 * DSIZE; // pad + prologue + epilogue
            let mut block = prologue.next();
            let mut prev_was_free = false;
            while block.header().size() != 0 {
                let addr = block.addr();
                let header = block.header();
                let footer = block.footer();
                if header.into_bits() != footer.into_bits() {
                    return Err(CheckError::TagMismatch {
                        addr,
                        header: header.into_bits(),
                        footer: footer.into_bits(),
                    });
                }
                let size = header.size();
                if size % DSIZE != 0 || size < MIN_BLOCK_SIZE {
                    return Err(CheckError::BadSize { addr, size });
                }
                if addr % DSIZE != 0 {
                    return Err(CheckError::Misaligned { addr });
                }
                let free = !header.allocated();
                if free {
                    if prev_was_free {
                        return Err(CheckError::AdjacentFree {
                            addr: block.prev().addr(),
                            next: addr,
                        });
                    }
                    if !self.on_class_list(block) {
                        return Err(CheckError::NotOnList {
                            addr,
                            class: class_of(size),
                        });
                    }
                    stats.free_blocks += 1;
                    stats.free_bytes += size;
                }
                stats.blocks += 1;
                stats.heap_bytes += size;
                prev_was_free = free;
                block = block.next();
            }

            if !block.header().allocated() {
                return Err(CheckError::BadEpilogue { addr: block.addr() });
            }

            // List-order walk: every entry free, rightly classed, doubly
            // linked, and nothing listed beyond the free blocks seen above.
            let mut listed = 0;
            for class in 0..NUM_CLASSES {
                let mut prev = core::ptr::null_mut::<u8>();
                let mut cursor = self.free_lists().head(class);
                while !cursor.is_null() {
                    let entry = Block::from_payload(cursor);
                    let addr = entry.addr();
                    if entry.is_allocated() {
                        return Err(CheckError::AllocatedOnList { addr, class });
                    }
                    let size = entry.size();
                    if class_of(size) != class {
                        return Err(CheckError::WrongClass { addr, size, class });
                    }
                    if entry.prev_free() != prev {
                        return Err(CheckError::BrokenLinks { addr, class });
                    }
                    stats.classes[class] += 1;
                    listed += 1;
                    prev = cursor;
                    cursor = entry.next_free();
                }
            }
            if listed != stats.free_blocks {
                return Err(CheckError::ListCountMismatch {
                    listed,
                    walked: stats.free_blocks,
                });
            }
        }

        Ok(stats)
    }

    /// Log the heap layout: one line per block plus per-class occupancy.
    pub fn dump(&self) {
        if !self.is_initialized() {
            info!("heap: uninitialized");
            return;
        }
        unsafe {
            info!("heap dump (prologue at {:p}):", self.prologue());
            let mut block = Block::from_payload(self.prologue()).next();
            while block.header().size() != 0 {
                info!(
                    "  {:#x}: {:5} bytes {}",
                    block.addr(),
                    block.size(),
                    if block.is_allocated() { "allocated" } else { "free" },
                );
                block = block.next();
            }
            info!("  {:#x}: epilogue", block.addr() - WSIZE);
            for class in 0..NUM_CLASSES {
                let mut entries = 0;
                let mut cursor = self.free_lists().head(class);
                while !cursor.is_null() {
                    entries += 1;
                    cursor = Block::from_payload(cursor).next_free();
                }
                if entries > 0 {
                    info!("  class {class}: {entries} free");
                }
            }
        }
    }

    /// Linear scan of one class list for `block`.
    unsafe fn on_class_list(&self, block: Block) -> bool {
        unsafe {
            let mut cursor = self.free_lists().head(class_of(block.size()));
            while !cursor.is_null() {
                if cursor == block.payload() {
                    return true;
                }
                cursor = Block::from_payload(cursor).next_free();
            }
        }
        false
    }
}
