//! # Heap Backing Region
//!
//! The lower layer underneath the allocator: a contiguous byte region that
//! only ever grows upward. The allocator never touches the backing storage
//! directly; it asks a [`RegionProvider`] for more bytes and receives the
//! base address of the freshly grown tail.
//!
//! Two guarantees make the allocator's block arithmetic sound:
//!
//! - every returned base address is aligned to [`REGION_ALIGN`] bytes, and
//! - successive extensions are **contiguous**: a call returning `base` with
//!   `n` bytes is followed by a call returning exactly `base + n`.
//!
//! [`FixedRegion`] is the provided implementation: a fixed-capacity inline
//! arena with a break offset, suitable both for hosted tests and as the
//! backing store of a static global allocator.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod fixed;

pub use fixed::FixedRegion;

use core::ptr::NonNull;

/// Alignment guaranteed for every base address returned by a provider, and
/// the granularity of extension requests.
pub const REGION_ALIGN: usize = 8;

/// Failure to grow a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// The provider cannot supply the requested number of bytes.
    #[error("region exhausted: requested {requested} bytes, {available} available")]
    Exhausted {
        /// Bytes asked for.
        requested: usize,
        /// Bytes the provider could still supply.
        available: usize,
    },
    /// The request was zero or not a multiple of [`REGION_ALIGN`].
    #[error("misaligned extension request of {requested} bytes")]
    Unaligned {
        /// Bytes asked for.
        requested: usize,
    },
}

/// A monotonically growing, contiguous byte region.
///
/// Implementations must uphold, for every successful call:
///
/// - the returned pointer is aligned to [`REGION_ALIGN`],
/// - the new `bytes` bytes are writable and exclusive to the caller until the
///   provider itself is dropped,
/// - extensions are contiguous and the region never moves or shrinks.
pub trait RegionProvider {
    /// Extend the region upward by exactly `bytes` and return the address of
    /// the first new byte.
    ///
    /// # Errors
    /// [`RegionError::Unaligned`] if `bytes` is zero or not a multiple of
    /// [`REGION_ALIGN`]; [`RegionError::Exhausted`] if the provider cannot
    /// supply the requested amount. A failed call leaves the region unchanged.
    fn extend(&mut self, bytes: usize) -> Result<NonNull<u8>, RegionError>;
}

impl<R: RegionProvider + ?Sized> RegionProvider for &mut R {
    fn extend(&mut self, bytes: usize) -> Result<NonNull<u8>, RegionError> {
        (**self).extend(bytes)
    }
}
