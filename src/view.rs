//! Non-owning strided windows into a [`Tensor`].
//!
//! A view carries a base pointer, a shape and a stride vector. Slicing a rank
//! `N` view by its leading index yields a rank `N - 1` view whose base is
//! offset by `index * strides[0]`; rank 1 views index straight into elements.
//! Slicing never allocates and the lifetime `'a` ties every view to the tensor
//! it was taken from.
//!
//! Leading indices are checked with `assert!` in every build, so an
//! out-of-range slice is a deterministic panic rather than a wild read.

use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
    ptr::NonNull,
};

use crate::{element::Element, tensor::Tensor};

pub struct View<'a, T, const N: usize> {
    ptr: NonNull<T>,
    shape: [usize; N],
    strides: [usize; N],
    _marker: PhantomData<&'a T>,
}

pub struct ViewMut<'a, T, const N: usize> {
    ptr: NonNull<T>,
    shape: [usize; N],
    strides: [usize; N],
    _marker: PhantomData<&'a mut T>,
}

impl<T, const N: usize> Clone for View<'_, T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize> Copy for View<'_, T, N> {}

impl<'a, T, const N: usize> View<'a, T, N> {
    /// # Safety
    ///
    /// For every position `p` inside `shape`, `ptr + dot(p, strides)` must be a
    /// valid, initialized `T` that stays alive and unmutated for `'a`.
    pub(crate) unsafe fn from_raw_parts(
        ptr: *const T,
        shape: [usize; N],
        strides: [usize; N],
    ) -> Self {
        Self {
            // SAFETY: tensor storage pointers are never null (dangling when empty).
            ptr: unsafe { NonNull::new_unchecked(ptr.cast_mut()) },
            shape,
            strides,
            _marker: PhantomData,
        }
    }

    pub fn shape(&self) -> &[usize; N] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize; N] {
        &self.strides
    }

    /// Size of the leading dimension.
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<'a, T, const N: usize> ViewMut<'a, T, N> {
    /// # Safety
    ///
    /// As [`View::from_raw_parts`], and no other access path to those elements
    /// may be used for `'a`.
    pub(crate) unsafe fn from_raw_parts(
        ptr: *mut T,
        shape: [usize; N],
        strides: [usize; N],
    ) -> Self {
        Self {
            // SAFETY: tensor storage pointers are never null (dangling when empty).
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            shape,
            strides,
            _marker: PhantomData,
        }
    }

    pub fn shape(&self) -> &[usize; N] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize; N] {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared view of the same window, borrowing `self`.
    pub fn as_view(&self) -> View<'_, T, N> {
        View {
            ptr: self.ptr,
            shape: self.shape,
            strides: self.strides,
            _marker: PhantomData,
        }
    }

    /// Shorter-lived mutable view of the same window.
    pub fn reborrow(&mut self) -> ViewMut<'_, T, N> {
        ViewMut {
            ptr: self.ptr,
            shape: self.shape,
            strides: self.strides,
            _marker: PhantomData,
        }
    }
}

#[inline]
#[track_caller]
fn check_index(index: usize, len: usize) {
    assert!(
        index < len,
        "index {index} out of range for leading dimension {len}"
    );
}

impl<'a, T> View<'a, T, 1> {
    pub fn get(&self, index: usize) -> Option<&'a T> {
        if index >= self.shape[0] {
            return None;
        }
        // SAFETY: `index` is inside the shape (see `from_raw_parts`).
        Some(unsafe { self.ptr.add(index * self.strides[0]).as_ref() })
    }
}

impl<T> Index<usize> for View<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        check_index(index, self.shape[0]);
        // SAFETY: `index` is inside the shape (see `from_raw_parts`).
        unsafe { self.ptr.add(index * self.strides[0]).as_ref() }
    }
}

impl<T> Index<usize> for ViewMut<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        check_index(index, self.shape[0]);
        // SAFETY: `index` is inside the shape (see `from_raw_parts`).
        unsafe { self.ptr.add(index * self.strides[0]).as_ref() }
    }
}

impl<T> IndexMut<usize> for ViewMut<'_, T, 1> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        check_index(index, self.shape[0]);
        // SAFETY: `index` is inside the shape and `self` is the unique access
        // path for its lifetime (see `from_raw_parts`).
        unsafe { self.ptr.add(index * self.strides[0]).as_mut() }
    }
}

/// Generates leading-index slicing from rank `$n` to rank `$m = $n - 1` for
/// views and tensors.
macro_rules! impl_rank_reduction {
    ($($n:literal => $m:literal),* $(,)?) => {$(
        impl<'a, T> View<'a, T, $n> {
            /// Rank-reducing slice at `index` along the leading dimension.
            ///
            /// # Panics
            ///
            /// Panics if `index >= self.len()`.
            #[track_caller]
            pub fn slice(&self, index: usize) -> View<'a, T, $m> {
                check_index(index, self.shape[0]);
                View {
                    // SAFETY: `index < shape[0]`, so the new base is the
                    // position `[index, 0, ..]` inside the shape.
                    ptr: unsafe { self.ptr.add(index * self.strides[0]) },
                    shape: std::array::from_fn(|d| self.shape[d + 1]),
                    strides: std::array::from_fn(|d| self.strides[d + 1]),
                    _marker: PhantomData,
                }
            }
        }

        impl<'a, T> ViewMut<'a, T, $n> {
            /// Mutable rank-reducing slice borrowing `self`.
            ///
            /// # Panics
            ///
            /// Panics if `index >= self.len()`.
            #[track_caller]
            pub fn slice_mut(&mut self, index: usize) -> ViewMut<'_, T, $m> {
                self.reborrow().into_slice(index)
            }

            /// Consuming variant of [`Self::slice_mut`] keeping the full lifetime.
            ///
            /// # Panics
            ///
            /// Panics if `index >= self.len()`.
            #[track_caller]
            pub fn into_slice(self, index: usize) -> ViewMut<'a, T, $m> {
                check_index(index, self.shape[0]);
                ViewMut {
                    // SAFETY: `index < shape[0]`, so the new base is the
                    // position `[index, 0, ..]` inside the shape.
                    ptr: unsafe { self.ptr.add(index * self.strides[0]) },
                    shape: std::array::from_fn(|d| self.shape[d + 1]),
                    strides: std::array::from_fn(|d| self.strides[d + 1]),
                    _marker: PhantomData,
                }
            }
        }

        impl<T: Element> Tensor<T, $n> {
            /// See [`View::slice`].
            #[track_caller]
            pub fn slice(&self, index: usize) -> View<'_, T, $m> {
                self.view().slice(index)
            }

            /// See [`ViewMut::into_slice`].
            #[track_caller]
            pub fn slice_mut(&mut self, index: usize) -> ViewMut<'_, T, $m> {
                self.view_mut().into_slice(index)
            }
        }
    )*};
}

impl_rank_reduction!(2 => 1, 3 => 2, 4 => 3, 5 => 4, 6 => 5);
