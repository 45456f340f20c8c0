//! Provides aligned, partially-initialized memory storage [`Storage`] for tensor data.
//! Handles allocation, deallocation, and basic access, with memory alignment.

use bytemuck::Zeroable;

use crate::{
    error::TensorError,
    memory::buffer::{Buffer, BufferBuilder},
};

/// `Storage<T>` is a partially-initialized memory container.
///
/// It wraps [`Buffer<T>`], which handles allocation and layout.
/// - The uninitialized tail (if any) of the `Buffer` is never exposed directly.
#[derive(Debug)]
pub struct Storage<T> {
    /// See [`crate::memory::buffer::Buffer`].
    buffer: Buffer<T>,
    /// The number of elements guaranteed to be initialized.
    init: usize,
}

impl<T> Storage<T> {
    /// Creates a new storage buffer for `numel` elements.
    ///
    /// Allocated memory is uninitialized. no elements are considered initialized yet.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the buffer can not be allocated.
    pub fn new(numel: usize) -> Result<Self, TensorError> {
        let buffer: Buffer<T> = BufferBuilder::new(numel).build()?;
        Ok(Self { buffer, init: 0 })
    }

    /// Creates a storage of exactly `numel` elements taken from `iter`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the buffer can not be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `iter` yields fewer than `numel` elements.
    pub fn from_iter_exact(
        numel: usize,
        iter: impl IntoIterator<Item = T>,
    ) -> Result<Self, TensorError> {
        let mut storage = Self::new(numel)?;
        for value in iter.into_iter().take(numel) {
            // SAFETY: `take(numel)` keeps `init < allocated_len()` before every write.
            unsafe { storage.write_unchecked(value) };
        }
        assert_eq!(storage.len(), numel, "iterator ended before {numel} elements");
        Ok(storage)
    }

    /// writes a value to the next uninitialized slot, extending `init` by 1.
    ///
    /// # Safety
    ///
    /// - `init < allocated_len()` must hold.
    pub unsafe fn write_unchecked(&mut self, value: T) {
        debug_assert!(self.init < self.allocated_len());
        // SAFETY:
        // - `self.as_mut_ptr()` is a valid, non-null, aligned pointer.
        // - `self.init` < `self.allocated_len()`
        unsafe {
            std::ptr::write(self.as_mut_ptr().add(self.init), value);
        }
        self.init += 1;
    }

    /// Returns the number of initialized elements.
    ///
    /// Only elements in `[0, len())` are safe to access.
    pub fn len(&self) -> usize {
        self.init
    }

    /// Returns the number of elements the buffer was originally allocated for.
    ///
    /// May be larger than `len()`; uninitialized tail must not be accessed.
    pub fn allocated_len(&self) -> usize {
        self.buffer.numel()
    }

    /// Returns `true` if no elements are initialized.
    pub fn is_empty(&self) -> bool {
        self.init == 0
    }

    /// Returns `true` if the storage owns a heap allocation.
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_allocated()
    }

    /// Returns the actual capacity in elements, accounting for allocator alignment.
    ///
    /// This may differ from `allocated_len()` if padding occurs.
    pub fn capacity(&self) -> usize {
        self.buffer.allocated_capacity()
    }

    /// Returns a raw const pointer to the start of the buffer.
    ///
    /// Only valid for reads within `[0, init)`.
    pub fn as_ptr(&self) -> *const T {
        self.buffer.as_ptr()
    }

    /// Returns a raw mut pointer to the start of the buffer.
    ///
    /// Only valid for writes within `[0, init)` or for manual initialization.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buffer.as_mut_ptr()
    }

    /// Returns a shared slice of all initialized elements `[0, init)`.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY:
        // - `self.as_ptr()` is a valid non-null, aligned pointer to
        //   allocated memory (or dangling when `init == 0`).
        // - `self.init` is a valid number of initialized elements
        //   within the allocated region.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.init) }
    }

    /// Returns a mutable slice of all initialized elements `[0, init)`.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY:
        // - `self.as_mut_ptr()` is a valid non-null, aligned pointer to
        //   allocated memory (or dangling when `init == 0`).
        // - `self.init` is a valid number of initialized elements
        //   within the allocated region.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.init) }
    }
}

impl<T: Zeroable> Storage<T> {
    /// Creates a storage of `numel` zero-valued elements.
    ///
    /// All elements are immediately initialized.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the buffer can not be allocated.
    pub fn zeroed(numel: usize) -> Result<Self, TensorError> {
        let buffer: Buffer<T> = BufferBuilder::new(numel).zeroed().build()?;
        // `T: Zeroable` makes every zero-filled slot a valid `T`.
        Ok(Self { buffer, init: numel })
    }
}

impl<T: Clone> Storage<T> {
    /// Creates a new storage buffer and clones each element from the given slice.
    ///
    /// All elements are immediately initialized.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the buffer can not be allocated.
    pub fn from_slice(slice: &[T]) -> Result<Self, TensorError> {
        Self::from_iter_exact(slice.len(), slice.iter().cloned())
    }

    /// Creates a new storage buffer of `numel` elements, each cloned from `value`.
    ///
    /// All elements are immediately initialized.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the buffer can not be allocated.
    pub fn filled_with(numel: usize, value: T) -> Result<Self, TensorError> {
        Self::from_iter_exact(numel, std::iter::repeat_n(value, numel))
    }
}

impl<T> Default for Storage<T> {
    /// An empty storage that owns no allocation.
    fn default() -> Self {
        Self {
            buffer: Buffer::dangling(),
            init: 0,
        }
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        // Drop all initialized elements
        for i in 0..self.init {
            // SAFETY:
            // - `buffer.as_mut_ptr()` is a valid, aligned non-null pointer.
            // - `ptr + i` is valid within initialized elements.
            // - `T` at `ptr + i` is initialized.
            unsafe {
                std::ptr::drop_in_place(self.buffer.as_mut_ptr().add(i));
            }
        }
    }
}
