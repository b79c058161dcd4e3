//! Longitudinal bunches pushed through an RF gap.
//!
//! A [`Bunch`] is a set of particles in `(phi, W)` phase coordinates, sampled
//! from a Gaussian distribution matched to longitudinal Twiss parameters. Each
//! particle is solved independently and in parallel; failed solves are kept
//! per particle rather than aborting the bunch.
//!
//! - [`Bunch::sample`]: seeded Gaussian sampling from Twiss parameters
//! - [`Bunch::track_through`] / [`Bunch::cross_gap`]: parallel gain solves
//!   with a progress bar
//! - [`BunchGains`]: per-particle outcomes, statistics and exit Twiss

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{Matrix2, Vector2};
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::energy::EnergyVector;
use crate::error::GapError;
use crate::gap::{AcceleratingRfGap, GapLocation};
use crate::spectrum::AxialFieldSpectrum;
use crate::twiss::Twiss;


/// Longitudinal phase coordinates of a set of particles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bunch {
    particles: Vec<EnergyVector>,
}

impl Bunch {
    pub fn new(particles: Vec<EnergyVector>) -> Self {
        Self { particles }
    }

    /// Samples `count` particles from a Gaussian whose covariance is the
    /// correlation matrix of `twiss`, centred on `centre`.
    ///
    /// The same `seed` always yields the same bunch. Without a seed the
    /// generator is seeded from the thread-local RNG.
    pub fn sample(
        twiss: &Twiss,
        centre: EnergyVector,
        count: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if !(twiss.beta() > 0.0 && twiss.emittance() > 0.0 && twiss.gamma().is_finite()) {
            return Err(anyhow!(
                "Twiss parameters need positive beta and emittance: {}",
                twiss
            ));
        }

        let chol = twiss.correlation_matrix().cholesky().ok_or_else(|| {
            anyhow!(
                "Twiss parameters do not describe a positive-definite distribution: {}",
                twiss
            )
        })?;
        let l = chol.l();

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let particles = (0..count)
            .map(|_| {
                let z: Vector2<f64> = Vector2::new(
                    StandardNormal.sample(&mut rng),
                    StandardNormal.sample(&mut rng),
                );
                let x = l * z;
                centre + EnergyVector::new(x[0], x[1])
            })
            .collect();

        Ok(Self { particles })
    }

    pub fn particles(&self) -> &[EnergyVector] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Twiss parameters fitted to the bunch second moments.
    pub fn twiss(&self) -> Option<Twiss> {
        moments(&self.particles).map(|(_, cov)| Twiss::from_covariance(&cov))
    }

    /// Solves the gains of every particle on one side of the gap.
    pub fn track_through<S>(
        &self,
        gap: &AcceleratingRfGap<S>,
        location: GapLocation,
        charge: f64,
        rest_energy: f64,
        show_progress: bool,
    ) -> BunchGains
    where
        S: AxialFieldSpectrum + Sync,
    {
        self.track(&location.to_string(), show_progress, |particle| {
            gap.compute_gap_gains(location, charge, rest_energy, particle)
        })
    }

    /// Crosses the whole gap with every particle.
    pub fn cross_gap<S>(
        &self,
        gap: &AcceleratingRfGap<S>,
        charge: f64,
        rest_energy: f64,
        show_progress: bool,
    ) -> BunchGains
    where
        S: AxialFieldSpectrum + Sync,
    {
        self.track("gap", show_progress, |particle| {
            gap.traverse(charge, rest_energy, particle)
                .map(|trv| trv.total_gains())
        })
    }

    fn track<F>(&self, label: &str, show_progress: bool, solve: F) -> BunchGains
    where
        F: Fn(EnergyVector) -> Result<EnergyVector, GapError> + Sync,
    {
        let start = Instant::now();
        let pb = progress_bar(self.len() as u64, label, show_progress);

        let results: Vec<_> = self
            .particles
            .par_iter()
            .map(|particle| {
                let result = solve(*particle);
                pb.inc(1);
                result
            })
            .collect();

        pb.finish_and_clear();

        let gains = BunchGains {
            initial: self.particles.clone(),
            results,
        };

        let failures = gains.failures();
        info!(
            particles = self.len(),
            failures,
            elapsed = ?start.elapsed(),
            "tracked bunch through {}",
            label
        );
        if failures > 0 {
            warn!(
                "{} of {} particles failed to converge",
                failures,
                self.len()
            );
        }

        gains
    }
}

fn progress_bar(len: u64, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
    ) {
        pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Per-particle outcome of pushing a bunch through a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct BunchGains {
    pub initial: Vec<EnergyVector>,
    pub results: Vec<Result<EnergyVector, GapError>>,
}

/// Mean and rms of the gains over converged particles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BunchStats {
    pub count: usize,
    pub failures: usize,
    pub mean_gains: EnergyVector,
    pub rms_gains: EnergyVector,
}

impl BunchGains {
    pub fn converged(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.converged()
    }

    /// Gains of the converged particles, in bunch order.
    pub fn gains(&self) -> Vec<EnergyVector> {
        self.results.iter().filter_map(|r| r.as_ref().ok().copied()).collect()
    }

    /// Phase coordinates after the gap for the converged particles.
    pub fn exit_coordinates(&self) -> Vec<EnergyVector> {
        self.initial
            .iter()
            .zip(self.results.iter())
            .filter_map(|(initial, result)| result.as_ref().ok().map(|gains| *initial + *gains))
            .collect()
    }

    /// `None` when no particle converged.
    pub fn stats(&self) -> Option<BunchStats> {
        let gains = self.gains();
        if gains.is_empty() {
            return None;
        }

        let dphi = Array1::from_iter(gains.iter().map(|g| g.phase));
        let dw = Array1::from_iter(gains.iter().map(|g| g.energy));

        Some(BunchStats {
            count: gains.len(),
            failures: self.failures(),
            mean_gains: EnergyVector::new(dphi.mean()?, dw.mean()?),
            rms_gains: EnergyVector::new(dphi.std(0.0), dw.std(0.0)),
        })
    }

    /// Twiss parameters fitted to the exit coordinates.
    pub fn exit_twiss(&self) -> Option<Twiss> {
        moments(&self.exit_coordinates()).map(|(_, cov)| Twiss::from_covariance(&cov))
    }
}

/// Mean and population covariance of a set of phase coordinates.
fn moments(points: &[EnergyVector]) -> Option<(EnergyVector, Matrix2<f64>)> {
    if points.is_empty() {
        return None;
    }

    let mut data = Array2::<f64>::zeros((points.len(), 2));
    for (mut row, p) in data.outer_iter_mut().zip(points.iter()) {
        row[0] = p.phase;
        row[1] = p.energy;
    }

    let mean = data.mean_axis(Axis(0))?;
    let centred = &data - &mean;
    let cov = centred.t().dot(&centred) / points.len() as f64;

    Some((
        EnergyVector::new(mean[0], mean[1]),
        Matrix2::new(cov[[0, 0]], cov[[0, 1]], cov[[1, 0]], cov[[1, 1]]),
    ))
}
