//! Runs a Gray-Scott simulation and optionally writes the final V field as a
//! binary PGM image.
//!
//! ```text
//! grayscott --backend vectorized --nx 512 --ny 512 --steps 5000 --seed 42 --output v.pgm
//! RUST_LOG=grayscott=debug grayscott --config params.json
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use grayscott::{Backend, OutputFormat, Parameters, Profiler, stencil::simd_capabilities};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Frames run when neither `--steps` nor `Nsteps` is given.
const DEFAULT_FRAMES: u64 = 100;

#[derive(Debug, Parser)]
#[command(version, about = "Gray-Scott reaction-diffusion simulation")]
struct Args {
    /// reference | vectorized (aliases: naive, simd, avx256)
    #[arg(long, default_value = "vectorized")]
    backend: String,

    /// JSON parameter file (keys Du, Dv, F, k, dt, initial_noise, Nx, Ny, Ns, seed, Nsteps, fps)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    nx: Option<usize>,

    #[arg(long)]
    ny: Option<usize>,

    /// Total number of steps, overrides `Nsteps`
    #[arg(long)]
    steps: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Initial noise amplitude
    #[arg(long)]
    noise: Option<f32>,

    /// Write the final V field to this file as binary PGM
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn parameters(&self) -> Result<Parameters> {
        let mut params = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid parameters in {}", path.display()))?
            }
            None => Parameters::default(),
        };

        if let Some(nx) = self.nx {
            params.nx = nx;
        }
        if let Some(ny) = self.ny {
            params.ny = ny;
        }
        if let Some(steps) = self.steps {
            params.nsteps = Some(steps);
        }
        if let Some(seed) = self.seed {
            params.seed = Some(seed);
        }
        if let Some(noise) = self.noise {
            params.initial_noise = noise;
        }
        Ok(params)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn write_pgm(path: &Path, sim: &dyn Backend, params: &Parameters) -> Result<()> {
    let (rows, cols) = params.grid();
    let mut pixels = vec![0u8; rows * cols];
    sim.copy_to_output(&mut pixels, OutputFormat::Gray8)?;

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write!(out, "P5\n{cols} {rows}\n255\n")?;
    out.write_all(&pixels)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let params = args.parameters()?;

    let mut sim = grayscott::create(&args.backend)
        .with_context(|| format!("backend `{}` is not available", args.backend))?;
    info!(backend = sim.name(), simd = ?simd_capabilities(), "selected backend");

    let mut profiler = Profiler::new();
    {
        let _init = profiler.section("initialize");
        sim.initialize(&params).context("failed to initialize the simulation")?;
    }

    let frame_len = u64::try_from(params.ns).unwrap_or(u64::MAX).max(1);
    let total = params.nsteps.unwrap_or(frame_len.saturating_mul(DEFAULT_FRAMES));
    let mut done = 0;
    while done < total {
        let n = frame_len.min(total - done);
        {
            let _frame = profiler.section("frame");
            for _ in 0..n {
                sim.step(params.dt)?;
            }
        }
        done += n;
        profiler.count("steps", i64::try_from(n).unwrap_or(i64::MAX));
        info!(step = done, total, "frame");
    }

    print!("{profiler}");

    if let Some(path) = &args.output {
        write_pgm(path, sim.as_ref(), &params)?;
        info!(path = %path.display(), "wrote V field");
    }
    Ok(())
}
