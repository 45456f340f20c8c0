//! # grayscott
//!
//! Gray-Scott reaction-diffusion on top of a small dense tensor library.
//!
//! ## Layers
//!
//! - [`Tensor`] owns a 64-byte aligned, row-major buffer of fixed rank `N`.
//!   [`View`] and [`ViewMut`] are borrowed strided windows; `slice(i)` drops
//!   the leading dimension.
//! - [`stencil`] holds two 3×3 convolutions over `Tensor<f32, 2>`: a scalar
//!   reference and an eight-wide FMA kernel (AVX2 or NEON, detected at runtime).
//! - [`GrayScott`] integrates the model with explicit Euler steps, generic over
//!   the convolution. [`create`] picks a variant by name and returns it as a
//!   [`Backend`] trait object.
//!
//! ```
//! use grayscott::{OutputFormat, Parameters, create};
//!
//! let mut sim = create("vectorized").unwrap();
//! let params = Parameters { nx: 32, ny: 32, seed: Some(42), ..Parameters::default() };
//! sim.initialize(&params).unwrap();
//! sim.advance_frame().unwrap();
//!
//! let mut image = vec![0u8; 32 * 32];
//! sim.copy_to_output(&mut image, OutputFormat::Gray8).unwrap();
//! ```

#![warn(
    clippy::perf,
    clippy::correctness,
    clippy::complexity,
    clippy::style,
    clippy::suspicious,
    // clippy::pedantic
)]
#![deny(clippy::undocumented_unsafe_blocks, clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]

mod element;
mod error;
mod profiler;
mod shape;
mod solver;
mod storage;
mod tensor;
mod tensorizable;
mod view;

pub mod memory;
pub mod stencil;

pub use element::{Element, FLOAT_EQ_EPSILON, Real};
pub use error::{SimError, TensorError, UnknownBackend};
pub use profiler::{Profiler, Section, Stats};
pub use shape::Shape;
pub use solver::{
    Backend, BackendKind, Field, GrayScott, LAPLACIAN, OutputFormat, Parameters, ReferenceBackend,
    VectorizedBackend, create,
};
pub use storage::Storage;
pub use tensor::Tensor;
pub use tensorizable::Tensorizable;
pub use view::{View, ViewMut};
