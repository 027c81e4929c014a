use crate::{REGION_ALIGN, RegionError, RegionProvider};
use core::cell::UnsafeCell;
use core::ptr::NonNull;

/// Backing storage with the alignment every returned base must carry.
#[repr(align(8))]
struct Arena<const N: usize>([u8; N]);

/// A fixed-capacity backing region.
///
/// The arena is stored inline, so a `FixedRegion` in a `static` needs no
/// runtime setup at all; growing is a break-offset bump. Once [`extend`] has
/// handed out a pointer the region value must not move, since all returned
/// addresses point into the inline arena.
///
/// [`extend`]: RegionProvider::extend
pub struct FixedRegion<const N: usize> {
    /// Inline arena. Accessed exclusively through raw pointers once the first
    /// extension has been handed out.
    arena: UnsafeCell<Arena<N>>,
    /// Current break offset; bytes below it belong to the caller.
    brk: usize,
}

impl<const N: usize> FixedRegion<N> {
    /// Create an empty region; no bytes are handed out yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arena: UnsafeCell::new(Arena([0; N])),
            brk: 0,
        }
    }

    /// Bytes handed out so far.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.brk
    }

    /// Total capacity of the arena.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for FixedRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RegionProvider for FixedRegion<N> {
    fn extend(&mut self, bytes: usize) -> Result<NonNull<u8>, RegionError> {
        if bytes == 0 || bytes % REGION_ALIGN != 0 {
            return Err(RegionError::Unaligned { requested: bytes });
        }
        let available = N - self.brk;
        if bytes > available {
            return Err(RegionError::Exhausted {
                requested: bytes,
                available,
            });
        }
        // The arena is 8-aligned and `brk` stays a multiple of 8, so every
        // returned base carries REGION_ALIGN.
        let base = unsafe { self.arena.get().cast::<u8>().add(self.brk) };
        self.brk += bytes;
        // SAFETY: `base` points into the inline arena and is never null.
        Ok(unsafe { NonNull::new_unchecked(base) })
    }
}
