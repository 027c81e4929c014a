use crate::block::{Block, CHUNK_SIZE, MIN_BLOCK_SIZE};
use crate::seglist::SegregatedLists;
use crate::tag::{self, BoundaryTag, DSIZE, WSIZE};
use core::cmp;
use core::ptr::{self, null_mut};
use heap_region::{RegionError, RegionProvider};

/// Failure to set up or grow the heap.
#[derive(Debug, thiserror::Error)]
pub enum HeapError {
    /// The backing region could not supply the requested bytes.
    #[error("backing region unavailable: {0}")]
    Region(#[from] RegionError),
}

/// Segregated free-list allocator over a growing backing region.
///
/// One value gathers all allocator state: the region provider, the prologue
/// payload pointer anchoring the heap, and the size-class table. Construction
/// is `const`; [`init`](Self::init) lays out the sentinels and carves the
/// first free chunk.
///
/// The heap between the sentinels is a sequence of blocks with boundary tags
/// (see [`Block`]); free blocks additionally sit on one of the twelve
/// size-class lists. Freeing coalesces immediately in both directions, so no
/// two adjacent blocks are ever both free.
pub struct SegListAllocator<R: RegionProvider> {
    region: R,
    /// Payload pointer of the prologue; null until `init` has succeeded.
    heap_base: *mut u8,
    lists: SegregatedLists,
}

// SAFETY: the raw pointers target the backing region, and every access to
// them goes through &mut self, so there is no aliasing across threads.
unsafe impl<R: RegionProvider + Send> Send for SegListAllocator<R> {}

impl<R: RegionProvider> SegListAllocator<R> {
    /// Construct an allocator over `region`; the heap is not laid out yet.
    #[must_use]
    pub const fn new(region: R) -> Self {
        Self {
            region,
            heap_base: null_mut(),
            lists: SegregatedLists::new(),
        }
    }

    /// Indicates whether [`init`](Self::init) has completed.
    pub const fn is_initialized(&self) -> bool {
        !self.heap_base.is_null()
    }

    /// The backing region.
    pub const fn region(&self) -> &R {
        &self.region
    }

    /// Lay out the heap: alignment pad, prologue header/footer, epilogue
    /// header, then one initial free chunk of [`CHUNK_SIZE`] bytes.
    ///
    /// Idempotent: a second call on an initialized allocator is a no-op.
    ///
    /// # Errors
    /// [`HeapError::Region`] if the region cannot supply the 16 sentinel
    /// bytes or the initial chunk. The allocator stays uninitialized.
    ///
    /// # Safety
    /// The allocator must sit at its final address: the heap stores absolute
    /// pointers into the region, so neither the allocator (when the region is
    /// owned inline) nor the region itself may move afterwards.
    pub unsafe fn init(&mut self) -> Result<(), HeapError> {
        if self.is_initialized() {
            return Ok(());
        }
        self.lists.clear();
        let base = self.region.extend(4 * WSIZE)?.as_ptr();
        unsafe {
            // Pad word, then the sentinels: an 8-byte allocated prologue and
            // a zero-size allocated epilogue header.
            tag::store(base, BoundaryTag::new());
            tag::store(base.add(WSIZE), BoundaryTag::pack(DSIZE, true));
            tag::store(base.add(2 * WSIZE), BoundaryTag::pack(DSIZE, true));
            tag::store(base.add(3 * WSIZE), BoundaryTag::pack(0, true));

            self.extend_heap(CHUNK_SIZE / WSIZE)?;
        }
        self.heap_base = unsafe { base.add(2 * WSIZE) };
        Ok(())
    }

    /// Payload pointer of the prologue block.
    pub(crate) const fn prologue(&self) -> *mut u8 {
        self.heap_base
    }

    pub(crate) const fn free_lists(&self) -> &SegregatedLists {
        &self.lists
    }

    /// Grow the heap by `words` 4-byte words, rounded up to keep 8-byte
    /// parity. The old epilogue header becomes the new block's header and a
    /// fresh epilogue is written at the new top; the block is coalesced with
    /// a free tail and inserted into its class list.
    unsafe fn extend_heap(&mut self, words: usize) -> Result<Block, HeapError> {
        let size = if words % 2 == 0 {
            words * WSIZE
        } else {
            (words + 1) * WSIZE
        };
        let base = self.region.extend(size)?.as_ptr();
        unsafe {
            let block = Block::from_payload(base);
            block.set_tags(size, false);
            block.next().set_header(BoundaryTag::pack(0, true));
            Ok(self.coalesce(block))
        }
    }

    /// Allocate `size` bytes and return an 8-aligned payload pointer, or null
    /// on a zero-size request, before `init`, or on region exhaustion.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        if size == 0 || !self.is_initialized() {
            return null_mut();
        }
        let Some(request) = size
            .checked_add(DSIZE - 1)
            .map(|s| s & !(DSIZE - 1))
            .and_then(|aligned| aligned.checked_add(DSIZE))
        else {
            return null_mut();
        };
        unsafe {
            if let Some(block) = self.lists.find_fit(request) {
                self.lists.remove(block);
                self.place(block, request);
                return block.payload();
            }
            // No fit anywhere: grow by at least one chunk. `extend_heap`
            // leaves the new block on a free list, so take it back off
            // before placing.
            let words = cmp::max(CHUNK_SIZE, request) / WSIZE;
            let Ok(block) = self.extend_heap(words) else {
                return null_mut();
            };
            self.lists.remove(block);
            self.place(block, request);
            block.payload()
        }
    }

    /// Release a block previously returned by [`allocate`](Self::allocate) or
    /// [`reallocate`](Self::reallocate).
    ///
    /// Null is ignored. If the block's header and footer disagree the pointer
    /// is not a valid live block; a warning is logged and the heap is left
    /// untouched.
    ///
    /// # Safety
    /// `ptr` must be null or a payload pointer obtained from this allocator
    /// that has not been freed since.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() || !self.is_initialized() {
            return;
        }
        let block = Block::from_payload(ptr);
        unsafe {
            let header = block.header();
            let footer = block.footer();
            if header.size() != footer.size() || header.allocated() != footer.allocated() {
                log::warn!("free: boundary tags disagree at {ptr:p}, ignoring");
                return;
            }
            block.set_tags(header.size(), false);
            self.coalesce(block);
        }
    }

    /// Resize a block by allocate-copy-free.
    ///
    /// A null `ptr` behaves as a plain allocation. On failure null is
    /// returned and the old block stays live; note that `size == 0` fails by
    /// the zero-size allocation policy.
    ///
    /// # Safety
    /// `ptr` must be null or a live payload pointer from this allocator.
    pub unsafe fn reallocate(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        let new = self.allocate(size);
        if new.is_null() {
            return null_mut();
        }
        unsafe {
            // The old payload length lives in the header: block size minus
            // the two boundary tags.
            let old_payload = Block::from_payload(ptr).size() - DSIZE;
            ptr::copy_nonoverlapping(ptr, new, cmp::min(old_payload, size));
            self.free(ptr);
        }
        new
    }

    /// Commit an allocation into a just-unlinked free block. Splits off the
    /// tail when the remainder can stand alone as a block; otherwise the
    /// whole block is taken and the slack becomes internal fragmentation.
    unsafe fn place(&mut self, block: Block, request: usize) {
        let actual = cmp::max(request, MIN_BLOCK_SIZE);
        unsafe {
            let block_size = block.size();
            let remainder = block_size - actual;
            if remainder >= MIN_BLOCK_SIZE {
                block.set_tags(actual, true);
                let rest = block.next();
                rest.set_tags(remainder, false);
                self.lists.insert(rest);
            } else {
                block.set_tags(block_size, true);
            }
        }
    }

    /// Merge a free block with its free physical neighbors, insert the result
    /// into its class list, and return it.
    ///
    /// The sentinels guarantee both neighbors exist and read as allocated at
    /// the heap edges, so four cases cover everything.
    unsafe fn coalesce(&mut self, block: Block) -> Block {
        unsafe {
            let prev_alloc = block.prev_is_allocated();
            let next = block.next();
            let next_alloc = next.is_allocated();

            let merged = match (prev_alloc, next_alloc) {
                (true, true) => block,
                (true, false) => {
                    self.lists.remove(next);
                    let size = block.size() + next.size();
                    block.set_tags(size, false);
                    block
                }
                (false, true) => {
                    let prev = block.prev();
                    self.lists.remove(prev);
                    let size = prev.size() + block.size();
                    prev.set_tags(size, false);
                    prev
                }
                (false, false) => {
                    let prev = block.prev();
                    self.lists.remove(prev);
                    self.lists.remove(next);
                    let size = prev.size() + block.size() + next.size();
                    prev.set_tags(size, false);
                    prev
                }
            };
            self.lists.insert(merged);
            merged
        }
    }
}
