use serde::{Deserialize, Serialize};
use std::{fmt, ops::*};


/// Longitudinal phase coordinates of a particle: phase w.r.t. the RF (radians)
/// and kinetic energy (eV).
///
/// The same pair carries gap gains, in which case `phase` is the phase jump
/// and `energy` the energy gain.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyVector {
    pub phase: f64,
    pub energy: f64,
}

impl EnergyVector {
    pub fn new(phase: f64, energy: f64) -> Self {
        Self { phase, energy }
    }

    pub fn from_degrees(phase_deg: f64, energy: f64) -> Self {
        Self::new(phase_deg.to_radians(), energy)
    }

    pub fn phase_degrees(&self) -> f64 {
        self.phase.to_degrees()
    }
}

impl Add for EnergyVector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            phase: self.phase + other.phase,
            energy: self.energy + other.energy,
        }
    }
}

impl AddAssign for EnergyVector {
    fn add_assign(&mut self, other: Self) {
        self.phase += other.phase;
        self.energy += other.energy;
    }
}

impl Sub for EnergyVector {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            phase: self.phase - other.phase,
            energy: self.energy - other.energy,
        }
    }
}

impl fmt::Display for EnergyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(phi: {:.6} rad [{:.4} deg], W: {:.6e} eV)",
            self.phase,
            self.phase_degrees(),
            self.energy
        )
    }
}
