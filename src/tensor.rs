use std::{
    fmt,
    ops::{Index, IndexMut},
};

use rand::{
    Rng,
    distributions::{Distribution, Uniform, uniform::SampleUniform},
};
use rand_distr::StandardNormal;

use crate::{
    element::{Element, Real},
    error::TensorError,
    memory::policy::CACHE_LINE_ALIGN,
    shape::Shape,
    storage::Storage,
    tensorizable::Tensorizable,
    view::{View, ViewMut},
};

/// Dense, row-major tensor of fixed rank `N` owning a 64-byte aligned buffer.
///
/// A tensor is never implicitly cloned: [`Tensor::copy`] is the only way to
/// duplicate contents, so no two tensors ever alias the same buffer.
pub struct Tensor<T, const N: usize> {
    storage: Storage<T>,
    shape: Shape<N>,
}

impl<T: Element, const N: usize> Tensor<T, N> {
    pub fn new(data: impl Tensorizable<T, N>) -> Result<Self, TensorError> {
        data.to_tensor()
    }

    /// Wraps an initialized storage.
    ///
    /// # Panics
    ///
    /// Panics if `storage` does not hold exactly `shape.total_size()` elements,
    /// or if the strides of `shape` overflow `usize`.
    pub fn from_raw(storage: Storage<T>, shape: Shape<N>) -> Self {
        assert!(
            shape.checked_strides().is_some(),
            "strides of {shape} overflow usize"
        );
        assert_eq!(
            storage.len(),
            shape.total_size(),
            "storage length does not match {shape}"
        );
        Self { storage, shape }
    }

    /// Allocates a tensor whose contents are unspecified.
    ///
    /// The current implementation zero-fills, but callers must write every
    /// element they later read.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn empty(shape: impl Into<Shape<N>>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let storage = Storage::zeroed(numel(&shape)?)?;
        Ok(Self { storage, shape })
    }

    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn zeros(shape: impl Into<Shape<N>>) -> Result<Self, TensorError> {
        Self::empty(shape)
    }

    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn ones(shape: impl Into<Shape<N>>) -> Result<Self, TensorError> {
        Self::full(shape, T::ONE)
    }

    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn full(shape: impl Into<Shape<N>>, value: T) -> Result<Self, TensorError> {
        let shape = shape.into();
        let storage = Storage::filled_with(numel(&shape)?, value)?;
        Ok(Self { storage, shape })
    }

    pub fn shape(&self) -> &Shape<N> {
        &self.shape
    }

    pub fn dims(&self) -> &[usize; N] {
        self.shape.dims()
    }

    pub fn strides(&self) -> [usize; N] {
        self.shape.strides()
    }

    pub fn total_size(&self) -> usize {
        self.shape.total_size()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_size() * std::mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.total_size() == 0
    }

    /// Returns `true` while the tensor owns a heap allocation.
    pub fn is_allocated(&self) -> bool {
        self.storage.is_allocated()
    }

    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    pub fn as_ptr(&self) -> *const T {
        self.storage.as_ptr()
    }

    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// Deep copy into a fresh buffer. The two tensors are independent afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn copy(&self) -> Result<Self, TensorError> {
        let storage = Storage::from_slice(self.as_slice())?;
        Ok(Self {
            storage,
            shape: self.shape,
        })
    }

    /// A fresh buffer of the same shape with unspecified contents.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn similar(&self) -> Result<Self, TensorError> {
        Self::empty(self.shape)
    }

    /// Moves the contents out, leaving `self` with an all-zero shape and no
    /// allocation.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Checked element access.
    pub fn get(&self, position: [usize; N]) -> Option<&T> {
        if !self.shape.contains(&position) {
            return None;
        }
        self.as_slice().get(self.shape.offset(&position))
    }

    pub fn view(&self) -> View<'_, T, N> {
        // SAFETY: every position inside `self.shape` maps, through the derived
        // row-major strides, to an initialized element of the storage, and the
        // view borrows `self` immutably for its whole lifetime.
        unsafe { View::from_raw_parts(self.storage.as_ptr(), *self.dims(), self.strides()) }
    }

    pub fn view_mut(&mut self) -> ViewMut<'_, T, N> {
        let (dims, strides) = (*self.dims(), self.strides());
        // SAFETY: as in `view`, and the view borrows `self` mutably so it is
        // the only access path while it lives.
        unsafe { ViewMut::from_raw_parts(self.storage.as_mut_ptr(), dims, strides) }
    }
}

/// Element count of an addressable shape: neither the count nor any stride
/// may overflow, even when a zero dimension makes the tensor empty.
fn numel<const N: usize>(shape: &Shape<N>) -> Result<usize, TensorError> {
    shape
        .checked_strides()
        .and(shape.checked_total_size())
        .ok_or(TensorError::Allocation {
            bytes: usize::MAX,
            align: CACHE_LINE_ALIGN,
        })
}

impl<T: Real + SampleUniform, const N: usize> Tensor<T, N> {
    /// Samples every element from the uniform distribution on `[0, 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn randu<R: Rng + ?Sized>(
        shape: impl Into<Shape<N>>,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        Self::sample(shape.into(), Uniform::new(T::ZERO, T::ONE), rng)
    }

    /// Samples every element from the standard normal distribution.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::Allocation`] if the aligned buffer can not be allocated.
    pub fn randn<R: Rng + ?Sized>(
        shape: impl Into<Shape<N>>,
        rng: &mut R,
    ) -> Result<Self, TensorError>
    where
        StandardNormal: Distribution<T>,
    {
        Self::sample(shape.into(), StandardNormal, rng)
    }

    fn sample<D: Distribution<T>, R: Rng + ?Sized>(
        shape: Shape<N>,
        dist: D,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let n = numel(&shape)?;
        let storage = Storage::from_iter_exact(n, dist.sample_iter(rng).take(n))?;
        Ok(Self { storage, shape })
    }
}

impl<T: Real, const N: usize> Tensor<T, N> {
    /// Elementwise `|a - b| <= abs_eps + rel_eps * max(|a|, |b|)`.
    ///
    /// Tensors of different shapes are never almost equal.
    pub fn almost_equal(&self, other: &Self, abs_eps: f64, rel_eps: f64) -> bool {
        self.shape == other.shape
            && self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .all(|(&a, &b)| a.almost_equal(b, abs_eps, rel_eps))
    }
}

impl<T, const N: usize> Default for Tensor<T, N> {
    /// The empty tensor: all-zero shape and no allocation.
    fn default() -> Self {
        Self {
            storage: Storage::default(),
            shape: Shape::default(),
        }
    }
}

impl<T: Element, const N: usize> PartialEq for Tensor<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .all(|(&a, &b)| a.approx_eq(b))
    }
}

impl<T: Element, const N: usize> fmt::Debug for Tensor<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.as_slice())
            .finish()
    }
}

/// Row-major element access.
///
/// # Panics
///
/// Debug builds panic on any position outside the shape. Release builds only
/// panic when the computed offset falls past the buffer; an out-of-range
/// coordinate that still lands inside it reads an unspecified element.
impl<T: Element, const N: usize> Index<[usize; N]> for Tensor<T, N> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &Self::Output {
        &self.as_slice()[self.shape.offset(&index)]
    }
}

/// See the [`Index`] impl for the out-of-range contract.
impl<T: Element, const N: usize> IndexMut<[usize; N]> for Tensor<T, N> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut Self::Output {
        let offset = self.shape.offset(&index);
        &mut self.as_mut_slice()[offset]
    }
}
