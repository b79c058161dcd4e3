//! Accelerating RF gap with a thin-lens, self-consistent energy model.
//!
//! A particle crossing the gap sees the gap potential modulated by the field
//! spectrum at its own wave number. The gains it picks up on each side of the
//! gap centre depend on the mid-gap phase and energy, which in turn depend on
//! the gains, so the phase jump and energy gain are found by fixed-point
//! iteration.
//!
//! - [`AcceleratingRfGap`]: the gap, holding frequency, potential, spectrum
//!   and solver settings
//! - [`GapLocation`]: which side of the gap centre a solve refers to
//! - [`SolverSettings`]: iteration budget and convergence tolerance
//! - [`GainSolution`] / [`GapTraversal`]: solve outputs
//!
//! Definitions, for charge `Q`, potential `V0`, rest energy `Er`, and kinetic
//! energy `W`:
//!
//! - `k0 = 2 pi f / c` and the particle wave number `k = k0 / beta`
//! - `K(W) = Q V0 k0 / (Er (beta gamma)^3)`
//! - Hamiltonian `H(phi, k) = E(k) e^{i phi}` with `E` the envelope spectrum
//!   on the requested side
//! - `dH/dphi` is taken as `-i H`, and `dH/dk = E'(k) e^{i phi}`
//! - energy gain `dW = -Q V0 Im(dH/dphi)`, phase jump `dphi = K Im(dH/dk)`

use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, warn};

use crate::complex::{euler, IUNIT};
use crate::config::{GAP_ERROR_TOLERANCE, GAP_MAX_ITERATIONS, LIGHT_SPEED, TWO_PI};
use crate::energy::EnergyVector;
use crate::error::GapError;
use crate::relativistic;
use crate::spectrum::AxialFieldSpectrum;


/// Side of the gap centre a gain computation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapLocation {
    /// From the gap entrance to the gap centre.
    PreGap,
    /// From the gap centre to the gap exit.
    PostGap,
}

impl fmt::Display for GapLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapLocation::PreGap => write!(f, "PREGAP"),
            GapLocation::PostGap => write!(f, "POSTGAP"),
        }
    }
}

impl FromStr for GapLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pregap" | "pre" => Ok(GapLocation::PreGap),
            "postgap" | "post" => Ok(GapLocation::PostGap),
            other => Err(format!(
                "unknown gap location '{}', expected 'pregap' or 'postgap'",
                other
            )),
        }
    }
}

/// Iteration budget and tolerance of the gain search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: u32,
    pub error_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: GAP_MAX_ITERATIONS,
            error_tolerance: GAP_ERROR_TOLERANCE,
        }
    }
}

/// Converged gains together with solver diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainSolution {
    pub gains: EnergyVector,
    pub iterations: u32,
    /// Residual of the final iteration.
    pub residual: f64,
}

/// Phase coordinates at the stations of a full gap crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapTraversal {
    pub initial: EnergyVector,
    pub pre_gap: EnergyVector,
    pub centre: EnergyVector,
    pub post_gap: EnergyVector,
    pub exit: EnergyVector,
}

impl GapTraversal {
    pub fn total_gains(&self) -> EnergyVector {
        self.exit - self.initial
    }
}

/// An RF gap whose energy gain and phase jump are solved self-consistently.
#[derive(Debug, Clone)]
pub struct AcceleratingRfGap<S> {
    frequency: f64,    // Hz
    potential: f64,    // V
    wave_number: f64,  // rad/m
    solver: SolverSettings,
    spectrum: S,
}

impl<S: AxialFieldSpectrum> AcceleratingRfGap<S> {
    /// Creates a gap driven at `frequency` (Hz) with potential `potential`
    /// (V) and the given field spectrum.
    pub fn new(frequency: f64, potential: f64, spectrum: S) -> Self {
        Self {
            frequency,
            potential,
            wave_number: TWO_PI * frequency / LIGHT_SPEED,
            solver: SolverSettings::default(),
            spectrum,
        }
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.solver.max_iterations = max_iterations;
        self
    }

    pub fn with_error_tolerance(mut self, error_tolerance: f64) -> Self {
        self.solver.error_tolerance = error_tolerance;
        self
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) {
        self.solver.max_iterations = max_iterations;
    }

    pub fn set_error_tolerance(&mut self, error_tolerance: f64) {
        self.solver.error_tolerance = error_tolerance;
    }

    pub fn set_rf_field_potential(&mut self, potential: f64) {
        self.potential = potential;
    }

    pub fn max_iterations(&self) -> u32 {
        self.solver.max_iterations
    }

    pub fn error_tolerance(&self) -> f64 {
        self.solver.error_tolerance
    }

    pub fn solver(&self) -> SolverSettings {
        self.solver
    }

    pub fn rf_frequency(&self) -> f64 {
        self.frequency
    }

    /// Free-space wave number of the RF, `2 pi f / c`.
    pub fn rf_wave_number(&self) -> f64 {
        self.wave_number
    }

    pub fn rf_field_potential(&self) -> f64 {
        self.potential
    }

    pub fn field_spectrum(&self) -> &S {
        &self.spectrum
    }

    /// Particle wave number `k0 / beta` at kinetic energy `w`.
    pub fn wave_number(&self, w: f64, er: f64) -> f64 {
        self.wave_number / relativistic::beta_from_energies(w, er)
    }

    /// Unit-charge phase-jump coefficient `V0 k0 / (Er (beta gamma)^3)`.
    pub fn norm_wave_number(&self, w: f64, er: f64) -> f64 {
        let gamma = relativistic::gamma_from_energies(w, er);
        let bg = (gamma * gamma - 1.0).sqrt();
        let bg3 = bg * bg * bg;

        (self.potential / (er * bg3)) * self.wave_number
    }

    /// `H(phi, k) = E(k) e^{i phi}` on the given side of the gap.
    pub fn hamiltonian(&self, location: GapLocation, phi: f64, k: f64) -> Complex<f64> {
        let spectrum = match location {
            GapLocation::PreGap => self.spectrum.pre_env_spectrum(k),
            GapLocation::PostGap => self.spectrum.post_env_spectrum(k),
        };
        spectrum * euler(phi)
    }

    /// Phase derivative of the Hamiltonian, `-i H`.
    pub fn dphi_hamiltonian(&self, location: GapLocation, phi: f64, k: f64) -> Complex<f64> {
        self.hamiltonian(location, phi, k) * -IUNIT
    }

    /// Wave-number derivative of the Hamiltonian, `E'(k) e^{i phi}`.
    pub fn dk_hamiltonian(&self, location: GapLocation, phi: f64, k: f64) -> Complex<f64> {
        let dk_spectrum = match location {
            GapLocation::PreGap => self.spectrum.dk_pre_env_spectrum(k),
            GapLocation::PostGap => self.spectrum.dk_post_env_spectrum(k),
        };
        dk_spectrum * euler(phi)
    }

    /// Phase jump and energy gain on one side of the gap.
    ///
    /// `charge` is in units of the elementary charge, `rest_energy` and the
    /// initial kinetic energy in eV, the initial phase in radians.
    pub fn compute_gap_gains(
        &self,
        location: GapLocation,
        charge: f64,
        rest_energy: f64,
        initial: EnergyVector,
    ) -> Result<EnergyVector, GapError> {
        self.solve_gap_gains(location, charge, rest_energy, initial)
            .map(|sol| sol.gains)
    }

    /// Fixed-point search for the gains, returning solver diagnostics.
    ///
    /// **How it Works**: Seed the gains with their values at the initial
    /// coordinates (phase jump from the initial wave number, energy gain at the
    /// initial phase). Then repeatedly evaluate both gain formulas at the
    /// mid-gap point `initial + gains` until the residual
    /// `(dphi_new - dphi)^2 + ((dW - dW_new) / W)^2` falls strictly below the
    /// tolerance. The phase-jump coefficient `K` stays at its initial-energy
    /// value throughout.
    pub fn solve_gap_gains(
        &self,
        location: GapLocation,
        charge: f64,
        rest_energy: f64,
        initial: EnergyVector,
    ) -> Result<GainSolution, GapError> {
        let phi_i = initial.phase;
        let w_i = initial.energy;

        let qv0 = charge * self.potential;
        let k_i = charge * self.norm_wave_number(w_i, rest_energy);
        let wave_num_i = self.wave_number(w_i, rest_energy);

        let mut dw = -qv0 * self.dphi_hamiltonian(location, phi_i, wave_num_i).im;
        let mut dphi = k_i * self.dk_hamiltonian(location, phi_i, wave_num_i).im;

        let mut err = 10.0 * self.solver.error_tolerance;
        let mut iterations = 0;

        while iterations < self.solver.max_iterations {
            iterations += 1;

            let phi = phi_i + dphi;
            let w = w_i + dw;
            let k = self.wave_number(w, rest_energy);

            let dphi_next = k_i * self.dk_hamiltonian(location, phi, k).im;
            let dw_next = -qv0 * self.dphi_hamiltonian(location, phi, k).im;

            let dphi_err = dphi_next - dphi;
            let dw_err = (dw - dw_next) / w_i;
            err = dphi_err * dphi_err + dw_err * dw_err;

            dphi = dphi_next;
            dw = dw_next;

            if err < self.solver.error_tolerance {
                debug!(
                    %location,
                    iterations,
                    residual = err,
                    dphi,
                    dw,
                    "gap gains converged"
                );
                return Ok(GainSolution {
                    gains: EnergyVector::new(dphi, dw),
                    iterations,
                    residual: err,
                });
            }
        }

        warn!(
            %location,
            iterations,
            residual = err,
            phi = phi_i,
            w = w_i,
            "gap gain iteration did not converge"
        );
        Err(GapError::NoConvergence {
            location,
            iterations,
            error: err,
        })
    }

    /// Crosses the whole gap: pre-gap gains from `initial` to the centre, then
    /// post-gap gains from the centre to the exit.
    pub fn traverse(
        &self,
        charge: f64,
        rest_energy: f64,
        initial: EnergyVector,
    ) -> Result<GapTraversal, GapError> {
        let pre_gap = self.compute_gap_gains(GapLocation::PreGap, charge, rest_energy, initial)?;
        let centre = initial + pre_gap;
        let post_gap = self.compute_gap_gains(GapLocation::PostGap, charge, rest_energy, centre)?;
        let exit = centre + post_gap;

        Ok(GapTraversal {
            initial,
            pre_gap,
            centre,
            post_gap,
            exit,
        })
    }
}
