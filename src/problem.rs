//! Configured gap computation from settings to results.
//!
//! A [`Problem`] builds the gap described by [`Settings`] and runs, in
//! order: the reference-particle solve on the configured side of the gap, a
//! full gap crossing, an optional phase scan and an optional bunch. Results
//! collect in a serialisable [`RunSummary`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::bunch::{Bunch, BunchGains, BunchStats};
use crate::energy::EnergyVector;
use crate::gap::{AcceleratingRfGap, GainSolution, GapLocation, GapTraversal};
use crate::output;
use crate::relativistic;
use crate::scan::{scan_phases, ScanResult};
use crate::settings::Settings;
use crate::spectrum::BoxedSpectrum;
use crate::twiss::Twiss;


/// Serialisable record of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub location: Option<GapLocation>,
    pub initial: EnergyVector,
    pub solution: Option<GainSolution>,
    pub failure: Option<String>,
    pub traversal: Option<GapTraversal>,
    pub traversal_failure: Option<String>,
    /// Emittance ratios `(transverse, longitudinal)` over the gap crossing.
    pub damping: Option<(f64, f64)>,
    /// Phase of maximum energy gain over the scan, with that gain.
    pub crest: Option<EnergyVector>,
    pub bunch: Option<BunchStats>,
    pub exit_twiss: Option<Twiss>,
}

/// A gap computation built from settings.
pub struct Problem {
    pub settings: Settings,
    pub gap: AcceleratingRfGap<BoxedSpectrum>,
    pub summary: RunSummary,
    pub scan: Option<ScanResult>,
    pub bunch: Option<BunchGains>,
}

impl Problem {
    pub fn new(settings: Settings) -> Self {
        let gap = AcceleratingRfGap::new(
            settings.frequency,
            settings.potential,
            settings.spectrum.build(),
        )
        .with_solver(settings.solver);

        Self {
            settings,
            gap,
            summary: RunSummary::default(),
            scan: None,
            bunch: None,
        }
    }

    /// Initial coordinates of the reference particle.
    pub fn initial(&self) -> EnergyVector {
        EnergyVector::from_degrees(self.settings.phase, self.settings.energy)
    }

    /// Runs every configured stage.
    ///
    /// A reference solve or gap crossing that fails is recorded in the
    /// summary and the run continues. A failed phase-scan point aborts the
    /// run.
    pub fn solve(&mut self) -> Result<()> {
        let start = Instant::now();
        info!("Solving problem...");

        let s = &self.settings;
        let initial = self.initial();
        let mut summary = RunSummary {
            location: Some(s.location),
            initial,
            ..Default::default()
        };

        match self
            .gap
            .solve_gap_gains(s.location, s.charge, s.rest_energy, initial)
        {
            Ok(solution) => {
                info!(
                    iterations = solution.iterations,
                    residual = solution.residual,
                    "{} gains: {}",
                    s.location,
                    solution.gains
                );
                summary.solution = Some(solution);
            }
            Err(err) => {
                warn!("{}", err);
                summary.failure = Some(err.to_string());
            }
        }

        match self.gap.traverse(s.charge, s.rest_energy, initial) {
            Ok(traversal) => {
                let gains = traversal.total_gains();
                info!("gap crossing gains: {}", gains);
                summary.damping = Some(relativistic::adiabatic_damping(
                    initial.energy,
                    gains.energy,
                    s.rest_energy,
                ));
                summary.traversal = Some(traversal);
            }
            Err(err) => {
                warn!("gap crossing failed: {}", err);
                summary.traversal_failure = Some(err.to_string());
            }
        }

        if let Some(phase_scan) = &s.scan {
            let scan = scan_phases(
                &self.gap,
                s.location,
                s.charge,
                s.rest_energy,
                s.energy,
                phase_scan,
            )?;
            summary.crest = scan.crest();
            if let Some(crest) = summary.crest {
                info!(
                    "crest at {:.4} deg with gain {:.6e} eV",
                    crest.phase_degrees(),
                    crest.energy
                );
            }
            self.scan = Some(scan);
        }

        if let Some(bunch_settings) = &s.bunch {
            let bunch = Bunch::sample(&bunch_settings.twiss, initial, bunch_settings.particles, s.seed)
                .context("Failed to sample bunch")?;
            let gains = bunch.track_through(&self.gap, s.location, s.charge, s.rest_energy, true);
            summary.bunch = gains.stats();
            summary.exit_twiss = gains.exit_twiss();
            if let Some(twiss) = &summary.exit_twiss {
                info!("exit Twiss: {}", twiss);
            }
            self.bunch = Some(gains);
        }

        self.summary = summary;

        info!("Time taken: {:.2?}", start.elapsed());

        Ok(())
    }

    /// Writes the summary, the effective settings and any scan or bunch
    /// tables to the output directory.
    pub fn writeup(&self) -> Result<()> {
        let dir = Path::new(&self.settings.output_dir);
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;

        output::write_summary(&dir.join("summary.json"), &self.summary)?;
        output::write_settings(&dir.join("settings.toml"), &self.settings)?;
        if let Some(scan) = &self.scan {
            output::write_scan(&dir.join("phase_scan.dat"), scan)?;
        }
        if let Some(gains) = &self.bunch {
            output::write_bunch(&dir.join("bunch.dat"), gains)?;
        }

        info!("Results written to {:?}", dir);
        Ok(())
    }
}
