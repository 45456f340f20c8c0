//! Gray-Scott reaction-diffusion on top of the tensor and stencil layers.

mod backend;
mod gray_scott;
mod params;

pub use backend::{Backend, BackendKind, OutputFormat, create};
pub use gray_scott::{Field, GrayScott, LAPLACIAN, ReferenceBackend, VectorizedBackend};
pub use params::Parameters;
