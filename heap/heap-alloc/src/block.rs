use crate::tag::{self, BoundaryTag, DSIZE, WSIZE};

/// Default heap extension granule in bytes.
pub const CHUNK_SIZE: usize = 4096;

/// Smallest viable block: header and footer plus room for the two free-list
/// links that live in a free block's payload. Derived from the pointer width,
/// so 24 bytes on 32-bit targets and 32 bytes on 64-bit targets.
pub const MIN_BLOCK_SIZE: usize = align_up(DSIZE + 2 * size_of::<*mut u8>());

/// Round `n` up to the next multiple of [`DSIZE`].
#[must_use]
pub const fn align_up(n: usize) -> usize {
    (n + (DSIZE - 1)) & !(DSIZE - 1)
}

/// View over one block, addressed by its **payload pointer**: the address
/// handed to clients, sitting one word past the header.
///
/// A block in memory:
///
/// ```text
/// +--------+------------------------------+--------+
/// | header |           payload            | footer |
/// +--------+------------------------------+--------+
///          ^ payload pointer (8-aligned)
/// ```
///
/// When the block is free, the first two pointer-sized payload words hold the
/// next/previous links of its size-class list.
///
/// The accessors assume an intact heap: header and footer agree, sizes are
/// nonzero multiples of 8, and the prologue/epilogue sentinels frame every
/// block. They are undefined on malformed heaps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Block(*mut u8);

impl Block {
    #[inline]
    pub(crate) const fn from_payload(bp: *mut u8) -> Self {
        Self(bp)
    }

    #[inline]
    pub(crate) const fn payload(self) -> *mut u8 {
        self.0
    }

    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.0 as usize
    }

    /// # Safety
    /// The payload pointer must lie within the heap, one word past a header.
    #[inline]
    pub(crate) unsafe fn header(self) -> BoundaryTag {
        unsafe { tag::load(self.0.sub(WSIZE)) }
    }

    /// # Safety
    /// As [`header`](Self::header).
    #[inline]
    pub(crate) unsafe fn set_header(self, t: BoundaryTag) {
        unsafe { tag::store(self.0.sub(WSIZE), t) }
    }

    /// # Safety
    /// The header must carry the block's true size; the footer address is
    /// derived from it.
    #[inline]
    pub(crate) unsafe fn footer(self) -> BoundaryTag {
        unsafe { tag::load(self.0.add(self.header().size() - DSIZE)) }
    }

    /// # Safety
    /// As [`footer`](Self::footer).
    #[inline]
    pub(crate) unsafe fn set_footer(self, t: BoundaryTag) {
        unsafe { tag::store(self.0.add(self.header().size() - DSIZE), t) }
    }

    /// # Safety
    /// As [`header`](Self::header).
    #[inline]
    pub(crate) unsafe fn size(self) -> usize {
        unsafe { self.header().size() }
    }

    /// # Safety
    /// As [`header`](Self::header).
    #[inline]
    pub(crate) unsafe fn is_allocated(self) -> bool {
        unsafe { self.header().allocated() }
    }

    /// Write header and footer in one go.
    ///
    /// # Safety
    /// The block's `size` bytes must lie within the heap; the footer is
    /// placed through the freshly written header.
    #[inline]
    pub(crate) unsafe fn set_tags(self, size: usize, allocated: bool) {
        let t = BoundaryTag::pack(size, allocated);
        unsafe {
            self.set_header(t);
            self.set_footer(t);
        }
    }

    /// The next block in address order.
    ///
    /// # Safety
    /// Only valid below the epilogue; the epilogue itself has no successor.
    #[inline]
    pub(crate) unsafe fn next(self) -> Self {
        Self(unsafe { self.0.add(self.size()) })
    }

    /// The previous block in address order, located through the preceding
    /// footer.
    ///
    /// # Safety
    /// Only valid above the prologue; the prologue itself has no predecessor.
    #[inline]
    pub(crate) unsafe fn prev(self) -> Self {
        let prev_size = unsafe { tag::load(self.0.sub(DSIZE)).size() };
        Self(unsafe { self.0.sub(prev_size) })
    }

    /// Allocation flag of the preceding block, read from its footer without
    /// computing the block itself.
    ///
    /// # Safety
    /// As [`prev`](Self::prev).
    #[inline]
    pub(crate) unsafe fn prev_is_allocated(self) -> bool {
        unsafe { tag::load(self.0.sub(DSIZE)).allocated() }
    }

    /// # Safety
    /// The block must be free; the link words live in its payload.
    #[inline]
    pub(crate) unsafe fn next_free(self) -> *mut u8 {
        unsafe { self.0.cast::<*mut u8>().read() }
    }

    /// # Safety
    /// As [`next_free`](Self::next_free).
    #[inline]
    pub(crate) unsafe fn set_next_free(self, p: *mut u8) {
        unsafe { self.0.cast::<*mut u8>().write(p) }
    }

    /// # Safety
    /// As [`next_free`](Self::next_free).
    #[inline]
    pub(crate) unsafe fn prev_free(self) -> *mut u8 {
        unsafe { self.0.cast::<*mut u8>().add(1).read() }
    }

    /// # Safety
    /// As [`next_free`](Self::next_free).
    #[inline]
    pub(crate) unsafe fn set_prev_free(self, p: *mut u8) {
        unsafe { self.0.cast::<*mut u8>().add(1).write(p) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_doublewords() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(9), 16);
        assert_eq!(align_up(4095), 4096);
    }

    #[test]
    fn min_block_holds_tags_and_links() {
        assert_eq!(MIN_BLOCK_SIZE % DSIZE, 0);
        assert!(MIN_BLOCK_SIZE >= DSIZE + 2 * size_of::<*mut u8>());
        #[cfg(target_pointer_width = "64")]
        assert_eq!(MIN_BLOCK_SIZE, 32);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(MIN_BLOCK_SIZE, 24);
    }

    #[test]
    fn tags_and_neighbors_over_a_raw_buffer() {
        // Two blocks of 32 bytes laid out by hand in an aligned buffer, with
        // one word of padding so payloads are 8-aligned.
        #[repr(align(8))]
        struct Buf([u8; 96]);
        let mut buf = Buf([0; 96]);
        let base: *mut u8 = buf.0.as_mut_ptr();

        unsafe {
            let first = Block::from_payload(base.add(WSIZE + WSIZE));
            first.set_tags(32, true);
            let second = first.next();
            second.set_tags(32, false);

            assert_eq!(first.size(), 32);
            assert!(first.is_allocated());
            assert_eq!(first.header().into_bits(), first.footer().into_bits());

            assert_eq!(second.addr(), first.addr() + 32);
            assert_eq!(second.prev(), first);
            assert!(second.prev_is_allocated());
            assert!(!second.is_allocated());

            second.set_next_free(first.payload());
            second.set_prev_free(core::ptr::null_mut());
            assert_eq!(second.next_free(), first.payload());
            assert!(second.prev_free().is_null());
        }
    }
}
