use anyhow::{anyhow, ensure, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::gap::{GapLocation, SolverSettings};
use crate::logging::LogLevel;
use crate::scan::PhaseScan;
use crate::spectrum::SpectrumModel;
use crate::twiss::Twiss;


/// Runtime configuration for a gap computation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// RF frequency (Hz).
    pub frequency: f64,
    /// Gap potential (V).
    pub potential: f64,
    /// Particle rest energy (eV).
    pub rest_energy: f64,
    /// Particle charge in units of the elementary charge.
    pub charge: f64,
    /// Initial phase (degrees).
    pub phase: f64,
    /// Initial kinetic energy (eV).
    pub energy: f64,
    pub location: GapLocation,
    pub seed: Option<u64>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub solver: SolverSettings,
    pub spectrum: SpectrumModel,
    #[serde(default)]
    pub scan: Option<PhaseScan>,
    #[serde(default)]
    pub bunch: Option<BunchSettings>,
}

/// Bunch to sample around the reference particle.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BunchSettings {
    pub particles: usize,
    /// Longitudinal Twiss parameters in `(phi [rad], W [eV])`.
    pub twiss: Twiss,
}

fn default_output_dir() -> String {
    "output".to_string()
}

/// Loads `config/default.toml` only, without environment or command-line
/// overrides.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("Error loading configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("Error deserializing configuration")?;

    validate_settings(&config)?;

    Ok(config)
}

/// Loads the configuration file, then layers `RFGAP_*` environment variables
/// and command-line arguments on top.
pub fn load_config() -> Result<Settings> {
    load_config_with_args(CliArgs::parse())
}

pub fn load_config_with_args(args: CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = if let Some(path) = &args.config {
        PathBuf::from(path)
    } else if local_config.exists() {
        local_config
    } else {
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(
            Environment::with_prefix("RFGAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("Error deserializing configuration")?;

    apply_cli_args(&mut config, args)?;

    validate_settings(&config)?;

    Ok(config)
}

fn apply_cli_args(config: &mut Settings, args: CliArgs) -> Result<()> {
    if let Some(frequency) = args.frequency {
        config.frequency = frequency;
    }
    if let Some(potential) = args.potential {
        config.potential = potential;
    }
    if let Some(rest_energy) = args.rest_energy {
        config.rest_energy = rest_energy;
    }
    if let Some(charge) = args.charge {
        config.charge = charge;
    }
    if let Some(phase) = args.phase {
        config.phase = phase;
    }
    if let Some(energy) = args.energy {
        config.energy = energy;
    }
    if let Some(location) = args.location {
        config.location = location;
    }
    if let Some(max_iter) = args.max_iter {
        config.solver.max_iterations = max_iter;
    }
    if let Some(tol) = args.tol {
        config.solver.error_tolerance = tol;
    }
    if let Some(gap_length) = args.gap_length {
        config.spectrum = SpectrumModel::Uniform { gap_length };
    }
    if let Some(scan) = args.scan {
        if let [start, stop, steps] = scan[..] {
            ensure!(
                steps >= 0.0 && steps.fract() == 0.0,
                "Scan step count must be a non-negative integer, got {}",
                steps
            );
            config.scan = Some(PhaseScan::new(start, stop, steps as usize));
        }
    }
    if let Some(particles) = args.particles {
        if let Some(bunch) = config.bunch.as_mut() {
            bunch.particles = particles;
        }
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    Ok(())
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the RFGAP_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("RFGAP_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Walk upward from the executable looking for a "config" subdirectory
    let exe_path = env::current_exe().context("Failed to get current executable path")?;
    let mut current_dir = exe_path.parent();
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir.to_path_buf());
        }
        current_dir = dir.parent();
    }

    Err(anyhow!("Could not find project root directory"))
}

pub fn validate_settings(config: &Settings) -> Result<()> {
    ensure!(
        config.frequency > 0.0 && config.frequency.is_finite(),
        "RF frequency must be positive, got {}",
        config.frequency
    );
    ensure!(
        config.potential.is_finite(),
        "Gap potential must be finite, got {}",
        config.potential
    );
    ensure!(
        config.rest_energy > 0.0 && config.rest_energy.is_finite(),
        "Rest energy must be positive, got {}",
        config.rest_energy
    );
    ensure!(
        config.charge.is_finite(),
        "Charge must be finite, got {}",
        config.charge
    );
    ensure!(
        config.phase.is_finite(),
        "Initial phase must be finite, got {}",
        config.phase
    );
    ensure!(
        config.energy > 0.0 && config.energy.is_finite(),
        "Initial kinetic energy must be positive, got {}",
        config.energy
    );
    ensure!(
        config.solver.max_iterations > 0,
        "Solver needs at least one iteration"
    );
    ensure!(
        config.solver.error_tolerance >= 0.0,
        "Solver tolerance must be non-negative, got {}",
        config.solver.error_tolerance
    );
    match &config.spectrum {
        SpectrumModel::Constant { .. } => {}
        SpectrumModel::Uniform { gap_length } => {
            ensure!(
                *gap_length > 0.0,
                "Gap length must be positive, got {}",
                gap_length
            );
        }
        SpectrumModel::Polynomial {
            frequency,
            offset,
            ttf,
            ..
        } => {
            ensure!(
                *frequency > 0.0 && frequency.is_finite(),
                "Spectrum fit frequency must be positive, got {}",
                frequency
            );
            ensure!(
                offset.is_finite(),
                "Field offset must be finite, got {}",
                offset
            );
            ensure!(!ttf.is_empty(), "Transit-time factor fit has no coefficients");
        }
    }
    if let Some(scan) = &config.scan {
        scan.validate()?;
    }
    if let Some(bunch) = &config.bunch {
        ensure!(bunch.particles > 0, "Bunch needs at least one particle");
        ensure!(
            bunch.twiss.beta() > 0.0 && bunch.twiss.emittance() > 0.0,
            "Bunch Twiss parameters need positive beta and emittance"
        );
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "rfgap - self-consistent RF gap phase jump and energy gain")]
pub struct CliArgs {
    /// Path to a configuration file. Defaults to config/local.toml if present, else config/default.toml.
    #[arg(short, long)]
    config: Option<String>,

    /// RF frequency in Hz.
    #[arg(short, long)]
    frequency: Option<f64>,

    /// Gap potential in V.
    #[arg(short = 'v', long)]
    potential: Option<f64>,

    /// Particle rest energy in eV.
    #[arg(long)]
    rest_energy: Option<f64>,

    /// Particle charge in units of the elementary charge.
    #[arg(short = 'q', long, allow_negative_numbers = true)]
    charge: Option<f64>,

    /// Initial phase in degrees.
    #[arg(short, long, allow_negative_numbers = true)]
    phase: Option<f64>,

    /// Initial kinetic energy in eV.
    #[arg(short, long)]
    energy: Option<f64>,

    /// Side of the gap centre: pregap or postgap.
    #[arg(short, long)]
    location: Option<GapLocation>,

    /// Iteration budget of the gain search.
    #[arg(long)]
    max_iter: Option<u32>,

    /// Convergence tolerance of the gain search.
    #[arg(long)]
    tol: Option<f64>,

    /// Use a hard-edge uniform-field gap of this length in m.
    #[arg(long)]
    gap_length: Option<f64>,

    /// Scan the initial phase. Format: start stop steps (degrees)
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    scan: Option<Vec<f64>>,

    /// Number of bunch particles. Requires a [bunch] section in the configuration.
    #[arg(long)]
    particles: Option<usize>,

    /// Random seed for bunch sampling.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Directory for output files.
    #[arg(short, long)]
    output_dir: Option<String>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - RF Frequency: {:.6e} Hz
  - Gap Potential: {:.6e} V
  - Rest Energy: {:.6e} eV
  - Charge: {}
  - Initial Phase: {:.4} deg
  - Initial Energy: {:.6e} eV
  - Location: {}
  - Max Iterations: {}
  - Tolerance: {:e}
  - Spectrum: {:?}
  ",
            self.frequency,
            self.potential,
            self.rest_energy,
            self.charge,
            self.phase,
            self.energy,
            self.location,
            self.solver.max_iterations,
            self.solver.error_tolerance,
            self.spectrum,
        )
    }
}
