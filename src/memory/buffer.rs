use std::{alloc::Layout, marker::PhantomData, ptr::NonNull};

use tracing::debug;

use crate::{
    error::TensorError,
    memory::policy::{
        AlignmentStrategy, CacheLineAlignment, CustomAlignment, InitStrategy, Uninitialized,
        Zeroed,
    },
};

/// Raw, aligned heap storage for elements of type `T`.
///
/// Owns the allocated memory and handles deallocation.
///
/// Every non-empty allocation starts on a 64-byte boundary unless a
/// [`CustomAlignment`] is requested through the [`BufferBuilder`].
///
/// # Note
///
/// `Buffer` only drops the underlying allocation.
/// It will **NOT** drop the `T` present in the allocated memory.
/// This storage is intended to be a low-surface-area unsafe pool
/// of aligned memory that can later be layered on with a safe abstraction.
#[derive(Debug)]
pub struct Buffer<T> {
    /// Pointer to start of allocation. Dangling when `layout.size() == 0`.
    ptr: NonNull<T>,
    /// Number of elements originally requested (`numel`).
    numel: usize,
    /// Full layout used during allocation (includes padding).
    layout: Layout,
    _owns: PhantomData<T>,
}

// SAFETY: `Buffer` uniquely owns its allocation, like `Box<[T]>`.
unsafe impl<T: Send> Send for Buffer<T> {}
// SAFETY: shared access only hands out `*const T`, like `Box<[T]>`.
unsafe impl<T: Sync> Sync for Buffer<T> {}

/// Builder for constructing a [`Buffer`] with custom settings.
///
/// This allows customizing memory alignment and whether the memory should be
/// zero-initialized.
pub struct BufferBuilder<I, A>
where
    A: AlignmentStrategy,
    I: InitStrategy,
{
    numel: usize,
    _marker: PhantomData<(A, I)>,
}

// The default constructor sets default policies.
// The return type is explicit: BufferBuilder<Uninitialized, CacheLineAlignment>
impl BufferBuilder<Uninitialized, CacheLineAlignment> {
    pub fn new(numel: usize) -> Self {
        Self {
            numel,
            _marker: PhantomData,
        }
    }
}

impl<I: InitStrategy, A: AlignmentStrategy> BufferBuilder<I, A> {
    /// The buffer will be allocated with all bytes set to zero.
    #[must_use]
    pub fn zeroed(self) -> BufferBuilder<Zeroed, A> {
        BufferBuilder::<Zeroed, A> {
            numel: self.numel,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_alignment<const ALIGN: usize>(self) -> BufferBuilder<I, CustomAlignment<ALIGN>> {
        BufferBuilder {
            numel: self.numel,
            _marker: PhantomData,
        }
    }

    /// Allocates the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the byte size overflows or the
    /// allocator cannot satisfy the aligned request.
    pub fn build<T>(self) -> Result<Buffer<T>, TensorError> {
        Buffer::with_alignment::<I, A>(self.numel)
    }
}

impl<T> Buffer<T> {
    /// A buffer holding no allocation at all.
    pub const fn dangling() -> Self {
        Buffer {
            ptr: NonNull::dangling(),
            numel: 0,
            layout: Layout::new::<()>(),
            _owns: PhantomData,
        }
    }

    /// Returns a `Buffer` for `numel` elements under the given policies.
    ///
    /// A `numel` of zero yields a dangling, allocation-free buffer.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a Zero-Sized Type.
    fn with_alignment<I: InitStrategy, Align: AlignmentStrategy>(
        numel: usize,
    ) -> Result<Self, TensorError> {
        assert!((std::mem::size_of::<T>() != 0), "ZSTs are not supported.");

        let align = Align::alignment::<T>();
        if numel == 0 {
            return Ok(Self::dangling());
        }

        let failure = |bytes| TensorError::Allocation { bytes, align };
        let size = self::utils::align_to::<T>(numel, align).ok_or(failure(usize::MAX))?;
        let layout = Layout::from_size_align(size, align).map_err(|_| failure(size))?;

        // SAFETY: `numel != 0` and `T` is not a ZST, so `size > 0`.
        let ptr = unsafe { I::allocate(layout) }.ok_or(failure(size))?;

        #[cfg(debug_assertions)]
        if I::POISON {
            // SAFETY:
            // - `ptr.as_ptr()` is a valid non-null aligned pointer to allocated memory.
            // - `size` is the number of *bytes* in the allocation.
            unsafe {
                std::ptr::write_bytes(ptr.as_ptr(), 0xAB, size);
            }
        }

        self::utils::zero_trailing_bytes::<T>(ptr.as_ptr(), numel, size);
        debug!(numel, bytes = size, align, "allocated buffer");

        Ok(Buffer {
            ptr: ptr.cast(),
            layout,
            numel,
            _owns: PhantomData,
        })
    }

    /// Returns the internal pointer to the underlying memory.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a mutable internal pointer to the underlying memory
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Return the underlying layout: [`std::alloc::Layout`]
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Return the total allocated size of storage in bytes.
    #[inline]
    pub fn allocated_size_bytes(&self) -> usize {
        self.layout().size()
    }

    /// Return the total number of elements `T` that can fit in the allocated memory.
    /// This includes space for padding beyond the requested number of elements.
    #[inline]
    pub fn allocated_capacity(&self) -> usize {
        self.layout().size() / std::mem::size_of::<T>()
    }

    /// Returns the number of elements originally requested (logical length).
    #[inline]
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Returns `true` if this buffer owns an allocation.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.layout.size() != 0
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::dangling()
    }
}

impl<T> Drop for Buffer<T> {
    /// Deallocates the buffer. Does **not** drop any `T`s.
    fn drop(&mut self) {
        if !self.is_allocated() {
            return;
        }
        // SAFETY:
        // - `self.ptr` is not modified from the original allocation
        // - `self.layout()` is the same layout used for the original allocation
        unsafe {
            std::alloc::dealloc(self.ptr.as_ptr().cast(), self.layout());
        }
    }
}

pub(crate) mod utils {
    /// Returns allocation size (in bytes) for `numel` elements of `T`,
    /// rounded up to the nearest multiple of `align`.
    ///
    /// Returns `None` on arithmetic overflow.
    #[inline]
    pub fn align_to<T>(numel: usize, align: usize) -> Option<usize> {
        let size_in_bytes = numel.checked_mul(std::mem::size_of::<T>())?;
        Some(size_in_bytes.checked_add(align - 1)? & !(align - 1))
    }

    /// Fills trailing padding bytes with zeroes (if any).
    ///
    /// This is useful when SIMD loads might read past initialized data.
    /// Does nothing if `length * size_of::<T>() >= size`.
    #[inline]
    pub fn zero_trailing_bytes<T>(ptr: *mut u8, length: usize, size: usize) {
        let start_offset = length * std::mem::size_of::<T>();
        if start_offset >= size {
            return;
        }

        let pad_bytes = size - start_offset;

        // SAFETY:
        // - `ptr.add(start_offset)` is within allocation of `size` bytes
        unsafe {
            std::ptr::write_bytes(ptr.add(start_offset), 0, pad_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_is_cache_line_aligned() {
        let buf: Buffer<f32> = BufferBuilder::new(13).build().unwrap();
        assert_eq!(buf.as_ptr() as usize % 64, 0);
        assert_eq!(buf.numel(), 13);
        // 13 * 4 = 52 bytes, padded up to one cache line.
        assert_eq!(buf.allocated_size_bytes(), 64);
        assert_eq!(buf.allocated_capacity(), 16);
    }

    #[test]
    fn custom_alignment_is_honored() {
        let buf: Buffer<f64> = BufferBuilder::new(3)
            .with_alignment::<256>()
            .build()
            .unwrap();
        assert_eq!(buf.as_ptr() as usize % 256, 0);
        assert_eq!(buf.layout().align(), 256);
    }

    #[test]
    fn zeroed_buffer_reads_zero() {
        let buf: Buffer<u32> = BufferBuilder::new(100).zeroed().build().unwrap();
        // SAFETY: zeroed memory is a valid `u32` and the range is in bounds.
        let data = unsafe { std::slice::from_raw_parts(buf.as_ptr(), buf.numel()) };
        assert!(data.iter().all(|&x| x == 0));
    }

    #[test]
    fn zero_elements_do_not_allocate() {
        let buf: Buffer<f32> = BufferBuilder::new(0).build().unwrap();
        assert!(!buf.is_allocated());
        assert_eq!(buf.numel(), 0);
        assert_eq!(buf.allocated_size_bytes(), 0);
    }

    #[test]
    fn overflowing_request_is_an_error() {
        let err = BufferBuilder::new(usize::MAX / 2).build::<f32>().unwrap_err();
        assert!(matches!(err, TensorError::Allocation { align: 64, .. }));
    }

    #[test]
    fn padding_is_zeroed() {
        let buf: Buffer<u8> = BufferBuilder::new(3).build().unwrap();
        // SAFETY: bytes [3, 64) were explicitly zeroed and lie inside the allocation.
        let pad = unsafe { std::slice::from_raw_parts(buf.as_ptr().add(3), 61) };
        assert!(pad.iter().all(|&b| b == 0));
    }
}
