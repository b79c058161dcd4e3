use thiserror::Error;

use crate::gap::GapLocation;

/// Failure of the gap gain search.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GapError {
    /// The fixed-point iteration used up its iteration budget before the
    /// residual dropped below the tolerance.
    #[error("{location}: failed to compute gap gain values after {iterations} iterations. Error = {error}")]
    NoConvergence {
        location: GapLocation,
        iterations: u32,
        error: f64,
    },
}

/// Physical-domain violation in a relativistic or optics input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainError {
    #[error("velocity beta must satisfy |beta| < 1, got {value}")]
    Superluminal { value: f64 },
    #[error("relativistic factor gamma must be at least 1, got {value}")]
    SubluminalGamma { value: f64 },
    #[error("rest energy must be finite and non-zero, got {value}")]
    RestEnergy { value: f64 },
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
}
