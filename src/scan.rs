//! Phase scans over one side of an RF gap.
//!
//! Solves the gap gains for a grid of initial phases at fixed initial energy,
//! in parallel with rayon, and tabulates `(phi0, dphi, dW)` per phase. The
//! grid is given in degrees; the table holds radians and eV.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::energy::EnergyVector;
use crate::gap::{AcceleratingRfGap, GapLocation};
use crate::spectrum::AxialFieldSpectrum;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::spectrum::{ConstantSpectrum, FieldSpectrum};
    use approx::assert_relative_eq;

    const ER: f64 = 938.272e6;

    #[test]
    fn grid_is_inclusive_and_in_radians() {
        let scan = PhaseScan::new(-90.0, 90.0, 7);
        let phases = scan.phases();
        assert_eq!(phases.len(), 7);
        assert_relative_eq!(phases[0], -std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(phases[6], std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(phases[3], 0.0);
    }

    #[test]
    fn rejects_empty_grid() {
        assert!(PhaseScan::new(0.0, 10.0, 0).validate().is_err());
        assert!(PhaseScan::new(0.0, 10.0, 1).validate().is_ok());
    }

    #[test]
    fn constant_spectrum_scan_follows_cosine() {
        let gap = AcceleratingRfGap::new(402.5e6, 1.0e6, ConstantSpectrum::unit());
        let scan = PhaseScan::new(-180.0, 180.0, 37);
        let result = scan_phases(&gap, GapLocation::PreGap, 1.0, ER, 2.5e6, &scan).unwrap();
        assert_eq!(result.table.dim(), (37, 3));
        for row in result.table.outer_iter() {
            assert_eq!(row[1], 0.0);
            assert_relative_eq!(row[2], 1.0e6 * row[0].cos(), epsilon = 1e-6);
        }
        let crest = result.crest().unwrap();
        assert_relative_eq!(crest.phase, 0.0, epsilon = 1e-12);
        assert_relative_eq!(crest.energy, 1.0e6, max_relative = 1e-12);
    }

    #[test]
    fn scan_rows_match_single_solves() {
        let gap = AcceleratingRfGap::new(402.5e6, 1.0e6, FieldSpectrum::uniform_gap(0.02));
        let scan = PhaseScan::new(-60.0, 0.0, 5);
        let result = scan_phases(&gap, GapLocation::PostGap, 1.0, ER, 2.5e6, &scan).unwrap();
        for (row, phi0) in result.table.outer_iter().zip(scan.phases().iter()) {
            let gains = gap
                .compute_gap_gains(GapLocation::PostGap, 1.0, ER, EnergyVector::new(*phi0, 2.5e6))
                .unwrap();
            assert_eq!(row[0], *phi0);
            assert_eq!(row[1], gains.phase);
            assert_eq!(row[2], gains.energy);
        }
    }

    #[test]
    fn failed_point_aborts_scan() {
        let gap = AcceleratingRfGap::new(402.5e6, 1.0e6, FieldSpectrum::uniform_gap(0.02))
            .with_max_iterations(1)
            .with_error_tolerance(0.0);
        let scan = PhaseScan::new(-30.0, 30.0, 3);
        let err = scan_phases(&gap, GapLocation::PreGap, 1.0, ER, 2.5e6, &scan).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to compute gap gain values"));
    }
}

/// Uniform grid of initial phases, in degrees, end points included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseScan {
    pub start: f64,
    pub stop: f64,
    pub steps: usize,
}

impl PhaseScan {
    pub fn new(start: f64, stop: f64, steps: usize) -> Self {
        Self { start, stop, steps }
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(anyhow!("phase scan needs at least one step"));
        }
        if !self.start.is_finite() || !self.stop.is_finite() {
            return Err(anyhow!(
                "phase scan bounds must be finite, got {} to {}",
                self.start,
                self.stop
            ));
        }
        Ok(())
    }

    /// Grid phases in radians.
    pub fn phases(&self) -> Array1<f64> {
        Array1::linspace(self.start, self.stop, self.steps).mapv(f64::to_radians)
    }
}

/// Tabulated scan, one row `(phi0, dphi, dW)` per grid phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub location: GapLocation,
    pub energy: f64, // initial kinetic energy (eV)
    pub table: Array2<f64>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.table.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initial phase with the largest energy gain, paired with that gain.
    pub fn crest(&self) -> Option<EnergyVector> {
        self.table
            .outer_iter()
            .max_by(|a, b| a[2].total_cmp(&b[2]))
            .map(|row| EnergyVector::new(row[0], row[2]))
    }
}

/// Solves the gains at every phase of `scan` for a particle of kinetic energy
/// `energy`.
///
/// Any phase whose solve fails aborts the scan with the failing phase in the
/// error context.
pub fn scan_phases<S>(
    gap: &AcceleratingRfGap<S>,
    location: GapLocation,
    charge: f64,
    rest_energy: f64,
    energy: f64,
    scan: &PhaseScan,
) -> Result<ScanResult>
where
    S: AxialFieldSpectrum + Sync,
{
    scan.validate()?;

    let phases = scan.phases();
    info!(
        %location,
        steps = scan.steps,
        start = scan.start,
        stop = scan.stop,
        "scanning gap phase"
    );

    let rows = phases
        .to_vec()
        .into_par_iter()
        .map(|phi0| {
            let initial = EnergyVector::new(phi0, energy);
            gap.compute_gap_gains(location, charge, rest_energy, initial)
                .map(|gains| [phi0, gains.phase, gains.energy])
                .with_context(|| format!("phase scan failed at phi0 = {:.4} deg", phi0.to_degrees()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = Array2::<f64>::zeros((rows.len(), 3));
    for (mut out, row) in table.outer_iter_mut().zip(rows.iter()) {
        out.assign(&Array1::from(row.to_vec()));
    }

    Ok(ScanResult {
        location,
        energy,
        table,
    })
}
