//! Memory allocation policies for buffers.
//!
//! This module provides strategy traits that control how memory is allocated and aligned.

use std::{alloc::Layout, ptr::NonNull};

/// Strategy for initializing allocated memory.
pub trait InitStrategy {
    /// Whether debug builds should poison the fresh allocation with `0xAB`.
    const POISON: bool;

    /// Allocates the given `layout` from the global allocator according to the
    /// strategy's initialization policy.
    ///
    /// Returns `None` if the allocator could not satisfy the request.
    ///
    /// # Safety
    ///
    /// `layout` must have a non-zero size.
    unsafe fn allocate(layout: Layout) -> Option<NonNull<u8>>;
}

/// Strategy for determining memory alignment requirements.
///
/// Implementations define alignment based on cache geometry, SIMD capabilities,
/// or custom requirements.
pub trait AlignmentStrategy {
    /// Returns the required memory alignment for type `T`.
    ///
    /// # Returns
    ///
    /// Memory alignment in bytes, always a power of two and never less than
    /// `align_of::<T>()`.
    fn alignment<T>() -> usize;
}

/// 64-byte alignment: one cache line on every supported target, and a
/// multiple of both the AVX2 (32) and NEON (16) vector widths.
pub const CACHE_LINE_ALIGN: usize = 64;

/// Cache-line alignment strategy, the default for tensor storage.
///
/// Every buffer starts on a 64-byte boundary regardless of target, so a row
/// that starts at a multiple of 16 `f32`s is also vector aligned.
pub struct CacheLineAlignment;

impl AlignmentStrategy for CacheLineAlignment {
    fn alignment<T>() -> usize {
        CACHE_LINE_ALIGN.max(std::mem::align_of::<T>())
    }
}

/// Custom alignment strategy with compile-time specified alignment.
///
/// Provides a fixed alignment value specified as a const generic parameter.
///
/// # Examples
///
/// ```
/// use grayscott::memory::policy::{AlignmentStrategy, CustomAlignment};
///
/// let alignment = CustomAlignment::<128>::alignment::<f64>();
/// assert_eq!(alignment, 128);
/// ```
pub struct CustomAlignment<const ALIGN: usize>;

impl<const ALIGN: usize> AlignmentStrategy for CustomAlignment<ALIGN> {
    /// Returns the custom alignment value.
    ///
    /// # Panics
    ///
    /// Panics if `ALIGN` is not a power of two.
    fn alignment<T>() -> usize {
        assert!(ALIGN.is_power_of_two());
        ALIGN.max(std::mem::align_of::<T>())
    }
}

/// Uninitialized memory allocation strategy.
///
/// Allocates memory without initializing it, leaving the contents undefined.
/// Users must write every element before reading it.
pub struct Uninitialized;

impl InitStrategy for Uninitialized {
    const POISON: bool = true;

    unsafe fn allocate(layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: the caller guarantees `layout` has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }
}

/// Zero-initialized memory allocation strategy.
///
/// Allocates memory and initializes all bytes to zero. Only sound to expose
/// as initialized when the all-zero bit pattern is a valid `T`.
pub struct Zeroed;

impl InitStrategy for Zeroed {
    const POISON: bool = false;

    unsafe fn allocate(layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: the caller guarantees `layout` has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }
}
