//! Explicit Euler integration of the Gray-Scott model
//!
//! ```text
//! dU/dt = Du ∇²U − UV² + F(1 − U)
//! dV/dt = Dv ∇²V + UV² − (F + k)V
//! ```
//!
//! on a `Ny × Nx` grid. The Laplacian only covers interior cells; border cells
//! see a zero Laplacian and evolve by the reaction terms alone.

use std::{marker::PhantomData, mem};

use rand::{
    SeedableRng,
    distributions::{Distribution, Uniform},
};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::{Backend, OutputFormat, Parameters};
use crate::{
    Tensor,
    error::SimError,
    stencil::{Scalar, Stencil, Vectorized},
};

pub type Field = Tensor<f32, 2>;

/// Isotropic 3×3 discrete Laplacian, row-major.
pub const LAPLACIAN: [[f32; 3]; 3] = [[0.05, 0.2, 0.05], [0.2, -1.0, 0.2], [0.05, 0.2, 0.05]];

pub type ReferenceBackend = GrayScott<Scalar>;
pub type VectorizedBackend = GrayScott<Vectorized>;

/// Solver generic over the convolution used for the Laplacian.
pub struct GrayScott<S> {
    state: Option<State>,
    steps: u64,
    _stencil: PhantomData<fn() -> S>,
}

struct State {
    params: Parameters,
    u: Field,
    v: Field,
    u_next: Field,
    v_next: Field,
    u_lap: Field,
    v_lap: Field,
    kernel: Field,
}

impl<S> Default for GrayScott<S> {
    fn default() -> Self {
        Self {
            state: None,
            steps: 0,
            _stencil: PhantomData,
        }
    }
}

impl<S: Stencil> GrayScott<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&State, SimError> {
        self.state.as_ref().ok_or(SimError::NotInitialized)
    }
}

impl State {
    fn new(params: &Parameters) -> Result<Self, SimError> {
        let shape = params.grid();
        let mut u = Field::empty(shape)?;
        let mut v = Field::empty(shape)?;

        let mut rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let noise = Uniform::new(-0.5_f32, 0.5);
        for (uc, vc) in u.as_mut_slice().iter_mut().zip(v.as_mut_slice()) {
            *uc = 1.0 + params.initial_noise * noise.sample(&mut rng);
            *vc = params.initial_noise * noise.sample(&mut rng);
        }

        Ok(Self {
            params: *params,
            u_next: u.similar()?,
            v_next: v.similar()?,
            u_lap: Field::zeros(shape)?,
            v_lap: Field::zeros(shape)?,
            kernel: Field::new(LAPLACIAN)?,
            u,
            v,
        })
    }
}

/// `x` clamped to `[0, 1]` and scaled to a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(x: f32) -> u8 {
    // In [0, 255] after the clamp; NaN maps to 0.
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl<S: Stencil> Backend for GrayScott<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn initialize(&mut self, params: &Parameters) -> Result<(), SimError> {
        params.validate()?;
        let state = State::new(params)?;
        info!(
            backend = S::NAME,
            rows = params.ny,
            cols = params.nx,
            seed = ?params.seed,
            "initialized Gray-Scott fields"
        );
        self.state = Some(state);
        self.steps = 0;
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), SimError> {
        let st = self.state.as_mut().ok_or(SimError::NotInitialized)?;
        S::apply(&st.u, &st.kernel, &mut st.u_lap)?;
        S::apply(&st.v, &st.kernel, &mut st.v_lap)?;

        let Parameters { du, dv, f, k, .. } = st.params;
        let (u, v) = (st.u.as_slice(), st.v.as_slice());
        let (u_lap, v_lap) = (st.u_lap.as_slice(), st.v_lap.as_slice());
        let cells = st.u_next.as_mut_slice().iter_mut().zip(st.v_next.as_mut_slice());
        for (i, (un, vn)) in cells.enumerate() {
            let (uc, vc) = (u[i], v[i]);
            let uvv = uc * vc * vc;
            let du_dt = du * u_lap[i] - uvv + f * (1.0 - uc);
            let dv_dt = dv * v_lap[i] + uvv - (f + k) * vc;
            *un = uc + du_dt * dt;
            *vn = vc + dv_dt * dt;
        }

        mem::swap(&mut st.u, &mut st.u_next);
        mem::swap(&mut st.v, &mut st.v_next);
        self.steps += 1;
        debug!(backend = S::NAME, step = self.steps, "step");
        Ok(())
    }

    fn copy_to_output(&self, dst: &mut [u8], format: OutputFormat) -> Result<usize, SimError> {
        let st = self.state()?;
        let (u, v) = (st.u.as_slice(), st.v.as_slice());
        let needed = u.len() * format.bytes_per_cell();
        if dst.len() < needed {
            return Err(SimError::OutputTooSmall {
                needed,
                got: dst.len(),
            });
        }

        match format {
            OutputFormat::Gray8 => {
                for (px, &vc) in dst.iter_mut().zip(v) {
                    *px = to_byte(vc);
                }
            }
            OutputFormat::Rgba8 => {
                for ((px, &uc), &vc) in dst.chunks_exact_mut(4).zip(u).zip(v) {
                    px.copy_from_slice(&[to_byte(uc), to_byte(vc), 0, u8::MAX]);
                }
            }
            OutputFormat::F32 => {
                let (head, tail) = dst[..needed].split_at_mut(needed / 2);
                head.copy_from_slice(bytemuck::cast_slice(u));
                tail.copy_from_slice(bytemuck::cast_slice(v));
            }
        }
        Ok(needed)
    }

    fn fields(&self) -> Result<(&Field, &Field), SimError> {
        let st = self.state()?;
        Ok((&st.u, &st.v))
    }

    fn params(&self) -> Option<&Parameters> {
        self.state.as_ref().map(|st| &st.params)
    }

    fn steps_taken(&self) -> u64 {
        self.steps
    }
}
