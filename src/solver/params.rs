use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Simulation parameters, fixed for the lifetime of one `initialize`.
///
/// Deserializes from the usual JSON configuration keys (`Du`, `Dv`, `F`, `k`,
/// `dt`, `initial_noise`, `Nx`, `Ny`, `Ns`, `seed`, `Nsteps`, `fps`); missing
/// keys take the [`Default`] values.
///
/// `Nx` is the grid width and `Ny` its height: fields are `ny` rows by `nx`
/// columns. Configurations written for an `Nx`-rows-by-`Ny`-columns layout
/// get the transposed grid; swap the two keys to keep their orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Diffusion rate of U.
    #[serde(rename = "Du")]
    pub du: f32,
    /// Diffusion rate of V.
    #[serde(rename = "Dv")]
    pub dv: f32,
    /// Feed rate.
    #[serde(rename = "F")]
    pub f: f32,
    /// Kill rate.
    pub k: f32,
    pub dt: f32,
    /// Amplitude of the uniform perturbation applied at initialization.
    pub initial_noise: f32,
    #[serde(rename = "Nx")]
    pub nx: usize,
    #[serde(rename = "Ny")]
    pub ny: usize,
    /// Sub-steps per frame.
    #[serde(rename = "Ns")]
    pub ns: usize,
    pub seed: Option<u64>,
    /// Total step budget for [`crate::Backend::run`].
    #[serde(rename = "Nsteps")]
    pub nsteps: Option<u64>,
    pub fps: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            du: 0.16,
            dv: 0.08,
            f: 0.035,
            k: 0.065,
            dt: 1.0,
            initial_noise: 0.1,
            nx: 256,
            ny: 256,
            ns: 10,
            seed: None,
            nsteps: None,
            fps: 30,
        }
    }
}

impl Parameters {
    /// Grid shape as `(rows, cols)`, that is `(ny, nx)`.
    pub fn grid(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        let rates = [("Du", self.du), ("Dv", self.dv), ("F", self.f), ("k", self.k)];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("expected a finite rate >= 0, got {value}")));
            }
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(invalid("dt", format!("expected a finite step > 0, got {}", self.dt)));
        }
        if !self.initial_noise.is_finite() {
            return Err(invalid("initial_noise", format!("not finite: {}", self.initial_noise)));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(invalid("Nx/Ny", format!("empty grid {}x{}", self.nx, self.ny)));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, why: String) -> SimError {
    SimError::InvalidParameter { name, why }
}
