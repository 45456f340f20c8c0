use std::{fmt, str::FromStr};

use tracing::warn;

use super::{Field, Parameters, ReferenceBackend, VectorizedBackend};
use crate::error::{SimError, UnknownBackend};

/// Byte encoding used by [`Backend::copy_to_output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One byte per cell: V clamped to `[0, 1]` and scaled to `0..=255`.
    Gray8,
    /// Four bytes per cell: R from U, G from V (both clamped and scaled), B = 0, A = 255.
    Rgba8,
    /// All U cells then all V cells as native-endian `f32`.
    F32,
}

impl OutputFormat {
    pub const fn bytes_per_cell(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgba8 => 4,
            Self::F32 => 2 * size_of::<f32>(),
        }
    }
}

/// A Gray-Scott solver variant, selected at runtime through [`create`].
pub trait Backend: Send {
    fn name(&self) -> &'static str;

    /// Allocates and seeds the fields. May be called again to reset.
    ///
    /// # Errors
    ///
    /// Fails on invalid parameters or allocation failure, in which case the
    /// previous state is kept.
    fn initialize(&mut self, params: &Parameters) -> Result<(), SimError>;

    /// One explicit Euler step of size `dt`. The new fields are current when
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotInitialized`] before the first `initialize`.
    fn step(&mut self, dt: f32) -> Result<(), SimError>;

    /// Encodes the current fields into `dst` and returns the number of bytes
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutputTooSmall`] when `dst` can not hold
    /// `cells * format.bytes_per_cell()` bytes.
    fn copy_to_output(&self, dst: &mut [u8], format: OutputFormat) -> Result<usize, SimError>;

    /// Current `(U, V)`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotInitialized`] before the first `initialize`.
    fn fields(&self) -> Result<(&Field, &Field), SimError>;

    fn params(&self) -> Option<&Parameters>;

    /// Steps since the last `initialize`.
    fn steps_taken(&self) -> u64;

    /// Runs `Ns` steps of the configured `dt`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotInitialized`] before the first `initialize`.
    fn advance_frame(&mut self) -> Result<(), SimError> {
        let params = *self.params().ok_or(SimError::NotInitialized)?;
        for _ in 0..params.ns {
            self.step(params.dt)?;
        }
        Ok(())
    }

    /// Runs the whole `Nsteps` budget.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingStepBudget`] when `Nsteps` is not set.
    fn run(&mut self) -> Result<(), SimError> {
        let params = *self.params().ok_or(SimError::NotInitialized)?;
        let budget = params.nsteps.ok_or(SimError::MissingStepBudget)?;
        for _ in 0..budget {
            self.step(params.dt)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Reference,
    Vectorized,
    /// Reserved for a device backend; never constructed.
    Accelerated,
}

impl BackendKind {
    /// Builds the solver for this kind, `None` for [`BackendKind::Accelerated`].
    pub fn build(self) -> Option<Box<dyn Backend>> {
        match self {
            Self::Reference => Some(Box::new(ReferenceBackend::default())),
            Self::Vectorized => Some(Box::new(VectorizedBackend::default())),
            Self::Accelerated => {
                warn!("the accelerated backend is not available");
                None
            }
        }
    }
}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "naive" => Ok(Self::Reference),
            "vectorized" | "simd" | "avx256" => Ok(Self::Vectorized),
            "accelerated" | "gpu" => Ok(Self::Accelerated),
            _ => Err(UnknownBackend(s.to_owned())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reference => "reference",
            Self::Vectorized => "vectorized",
            Self::Accelerated => "accelerated",
        };
        f.write_str(name)
    }
}

/// Solver factory keyed by name. Unknown names and the reserved accelerated
/// kind yield `None`.
pub fn create(kind: &str) -> Option<Box<dyn Backend>> {
    match kind.parse::<BackendKind>() {
        Ok(kind) => kind.build(),
        Err(err) => {
            warn!(%err, "no such backend");
            None
        }
    }
}
