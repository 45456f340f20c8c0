use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("failed to allocate {bytes} bytes aligned to {align}")]
    Allocation { bytes: usize, align: usize },
    #[error("inconsistent dimensions. expected: {expected:?}, received: {received:?}")]
    InconsistentDimensions {
        expected: Vec<usize>,
        received: Vec<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("solver used before `initialize`")]
    NotInitialized,
    #[error("invalid parameter `{name}`: {why}")]
    InvalidParameter { name: &'static str, why: String },
    #[error("output buffer too small: needed {needed} bytes, got {got}")]
    OutputTooSmall { needed: usize, got: usize },
    #[error("no step budget (`Nsteps`) configured")]
    MissingStepBudget,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend kind `{0}`")]
pub struct UnknownBackend(pub String);
