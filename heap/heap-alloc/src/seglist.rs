use crate::block::Block;
use core::ptr::null_mut;

/// Number of size classes.
pub const NUM_CLASSES: usize = 12;

/// Size class for a block of `size` bytes (overhead and alignment included).
///
/// The bottom four classes hold exactly one size each; small fixed-size
/// blocks dominate many workloads, and an exact class makes every hit a best
/// fit. Above 48 bytes the classes double up to the open-ended top class.
#[must_use]
pub(crate) const fn class_of(size: usize) -> usize {
    match size {
        ..=24 => 0,
        ..=32 => 1,
        ..=40 => 2,
        ..=48 => 3,
        ..=64 => 4,
        ..=128 => 5,
        ..=256 => 6,
        ..=512 => 7,
        ..=1024 => 8,
        ..=2048 => 9,
        ..=4096 => 10,
        _ => 11,
    }
}

/// The segregated free-list table: one doubly-linked list of free blocks per
/// size class, heads stored as payload pointers with null for empty.
///
/// Insertion is LIFO at the head: O(1), and recently freed blocks are reused
/// first while their tags are still warm in cache.
pub(crate) struct SegregatedLists {
    heads: [*mut u8; NUM_CLASSES],
}

impl SegregatedLists {
    pub(crate) const fn new() -> Self {
        Self {
            heads: [null_mut(); NUM_CLASSES],
        }
    }

    /// Reset every class to empty.
    pub(crate) fn clear(&mut self) {
        self.heads = [null_mut(); NUM_CLASSES];
    }

    /// Head of one class list, null when empty.
    pub(crate) const fn head(&self, class: usize) -> *mut u8 {
        self.heads[class]
    }

    /// Push a free block onto the head of its class list.
    ///
    /// # Safety
    /// `block` must be a free block with valid tags, not currently on any
    /// list.
    pub(crate) unsafe fn insert(&mut self, block: Block) {
        let class = unsafe { class_of(block.size()) };
        let head = self.heads[class];
        unsafe {
            block.set_prev_free(null_mut());
            block.set_next_free(head);
            if !head.is_null() {
                Block::from_payload(head).set_prev_free(block.payload());
            }
        }
        self.heads[class] = block.payload();
    }

    /// Unlink a free block from its class list and clear its own links.
    ///
    /// # Safety
    /// `block` must be on the list for its current size class.
    pub(crate) unsafe fn remove(&mut self, block: Block) {
        let class = unsafe { class_of(block.size()) };
        unsafe {
            let prev = block.prev_free();
            let next = block.next_free();
            if prev.is_null() {
                self.heads[class] = next;
            } else {
                Block::from_payload(prev).set_next_free(next);
            }
            if !next.is_null() {
                Block::from_payload(next).set_prev_free(prev);
            }
            block.set_next_free(null_mut());
            block.set_prev_free(null_mut());
        }
    }

    /// First-fit search: walk the request's own class head-to-tail, then each
    /// higher class in turn. The exact bottom classes make those hits best
    /// fits for free.
    ///
    /// # Safety
    /// The list invariants must hold.
    pub(crate) unsafe fn find_fit(&self, request: usize) -> Option<Block> {
        for class in class_of(request)..NUM_CLASSES {
            let mut cursor = self.heads[class];
            while !cursor.is_null() {
                let block = Block::from_payload(cursor);
                unsafe {
                    if block.size() >= request {
                        return Some(block);
                    }
                    cursor = block.next_free();
                }
            }
        }
        None
    }
}
