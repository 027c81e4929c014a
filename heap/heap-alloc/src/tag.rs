use bitfield_struct::bitfield;

/// Header/footer width in bytes.
pub const WSIZE: usize = 4;

/// Alignment and overhead unit in bytes.
pub const DSIZE: usize = 8;

/// Boundary-tag word: the packed `(size | alloc)` value stored in every
/// block's header and footer.
///
/// Block sizes are always multiples of 8, so the low three bits of a size are
/// spare; bit 0 carries the allocation flag and the size occupies the rest.
/// The in-memory representation is therefore bit-for-bit the classic
/// `size | alloc` word:
///
/// | Bits  | Name        | Meaning |
/// |-------|-------------|----------|
/// | 0     | `allocated` | Block is in use if set |
/// | 1–2   | —           | Spare, always zero |
/// | 3–31  | `units`     | Block size in 8-byte doublewords |
#[bitfield(u32)]
pub struct BoundaryTag {
    /// Allocation flag (bit 0).
    pub allocated: bool,
    /// Spare low bits; sizes are multiples of 8 so these stay zero.
    #[bits(2)]
    __: u8,
    /// Block size in 8-byte doublewords (bits 3..32).
    #[bits(29)]
    pub units: u32,
}

impl BoundaryTag {
    /// Block size in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        self.units() as usize * DSIZE
    }

    /// Replace the size, given in bytes. `size` must be a multiple of 8.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_size(self, size: usize) -> Self {
        debug_assert!(size % DSIZE == 0);
        self.with_units((size / DSIZE) as u32)
    }

    /// Compose a tag for a block of `size` bytes.
    #[must_use]
    pub const fn pack(size: usize, allocated: bool) -> Self {
        Self::new().with_size(size).with_allocated(allocated)
    }
}

/// Read the tag word at `p`.
///
/// # Safety
/// `p` must point to a valid, 4-aligned header or footer word.
#[inline]
pub(crate) unsafe fn load(p: *const u8) -> BoundaryTag {
    BoundaryTag::from_bits(unsafe { p.cast::<u32>().read() })
}

/// Write the tag word at `p`.
///
/// # Safety
/// `p` must point to a writable, 4-aligned header or footer word.
#[inline]
pub(crate) unsafe fn store(p: *mut u8, tag: BoundaryTag) {
    unsafe { p.cast::<u32>().write(tag.into_bits()) }
}
