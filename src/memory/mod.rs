//! Aligned raw memory used as the backing store of every tensor.

pub mod buffer;
pub mod policy;
