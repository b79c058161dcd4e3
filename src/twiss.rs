//! Courant-Snyder (Twiss) parameters of a single phase plane.
//!
//! This module stores the (alpha, beta, emittance) description of a beam
//! ellipse together with the quantities derived from it, and provides the
//! ellipse algebra used by envelope codes:
//! - Conversion to and from the equivalent-beam envelope (radius, slope)
//! - Construction from second moments or a 2x2 covariance block
//! - Ellipse rotation angle, eigenvalues, eigenvectors and semi-axes
//! - Transport through a 2x2 transfer matrix with emittance scaling
//!
//! # Conventions
//!
//! The Twiss matrix is `[[gamma, alpha], [alpha, beta]]` so that the ellipse
//! is `gamma x^2 + 2 alpha x x' + beta x'^2 = emittance`. Out-of-domain input
//! (beta <= 0, emittance < 0, emittance = 0 for envelopes) is not trapped and
//! surfaces as NaN or infinity in the derived quantities.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;


/// Defining triple used for (de)serialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TwissTriple {
    alpha: f64,
    beta: f64,
    emittance: f64,
}

/// Twiss parameters (alpha, beta, emittance) of one phase plane.
///
/// **Context**: Envelope tracking describes the beam in each phase plane by
/// the ellipse that bounds (or, for rms quantities, characterises) the
/// particle distribution. The same ellipse is equally described by the
/// equivalent-beam envelope radius and slope.
///
/// **How it Works**: The defining triple is stored along with the derived
/// gamma, envelope radius `sqrt(beta emittance)` and envelope slope
/// `-alpha sqrt(emittance/beta)`, all recomputed whenever the state is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "TwissTriple", into = "TwissTriple")]
pub struct Twiss {
    alpha: f64,
    beta: f64,
    gamma: f64,
    emittance: f64,
    env_radius: f64,
    env_slope: f64,
}

impl From<TwissTriple> for Twiss {
    fn from(t: TwissTriple) -> Self {
        Twiss::new(t.alpha, t.beta, t.emittance)
    }
}

impl From<Twiss> for TwissTriple {
    fn from(t: Twiss) -> Self {
        TwissTriple {
            alpha: t.alpha,
            beta: t.beta,
            emittance: t.emittance,
        }
    }
}

impl Twiss {
    /// Creates Twiss parameters from alpha, beta (m/rad) and emittance (m-rad).
    pub fn new(alpha: f64, beta: f64, emittance: f64) -> Self {
        let mut twiss = Self::default();
        twiss.set_twiss(alpha, beta, emittance);
        twiss
    }

    /// Creates Twiss parameters from the equivalent-beam envelope radius,
    /// envelope slope and emittance.
    pub fn from_envelope(env_radius: f64, env_slope: f64, emittance: f64) -> Self {
        let mut twiss = Self::default();
        twiss.set_envelope(env_radius, env_slope, emittance);
        twiss
    }

    /// Creates Twiss parameters from the second moments `<x^2>`, `<x x'>` and
    /// `<x'^2>`. The emittance is the square root of the moment determinant.
    pub fn from_moments(sig_x: f64, cov: f64, sig_xp: f64) -> Self {
        let det = sig_x * sig_xp - cov * cov;
        let emittance = det.sqrt();
        let beta = sig_x / emittance;
        let alpha = -cov / emittance;

        Self::new(alpha, beta, emittance)
    }

    /// Creates Twiss parameters from a 2x2 covariance block
    /// `[[<x^2>, <x x'>], [<x x'>, <x'^2>]]`.
    pub fn from_covariance(cov: &Matrix2<f64>) -> Self {
        Self::from_moments(cov[(0, 0)], cov[(1, 0)], cov[(1, 1)])
    }

    /// Replaces the state with the given Twiss triple.
    pub fn set_twiss(&mut self, alpha: f64, beta: f64, emittance: f64) {
        self.alpha = alpha;
        self.beta = beta;
        self.emittance = emittance;

        self.gamma = (1.0 + alpha * alpha) / beta;
        self.env_radius = (beta * emittance).sqrt();
        self.env_slope = -alpha * (emittance / beta).sqrt();
    }

    /// Replaces the state with the given envelope description.
    pub fn set_envelope(&mut self, env_radius: f64, env_slope: f64, emittance: f64) {
        self.env_radius = env_radius;
        self.env_slope = env_slope;
        self.emittance = emittance;

        self.alpha = -env_radius * env_slope / emittance;
        self.beta = env_radius * env_radius / emittance;
        self.gamma = (1.0 + self.alpha * self.alpha) / self.beta;
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn emittance(&self) -> f64 {
        self.emittance
    }

    pub fn envelope_radius(&self) -> f64 {
        self.env_radius
    }

    pub fn envelope_slope(&self) -> f64 {
        self.env_slope
    }

    /// The Twiss matrix `[[gamma, alpha], [alpha, beta]]`.
    pub fn twiss_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.gamma, self.alpha, self.alpha, self.beta)
    }

    /// The correlation (covariance) block
    /// `emittance * [[beta, -alpha], [-alpha, gamma]]`.
    pub fn correlation_matrix(&self) -> Matrix2<f64> {
        let e = self.emittance;
        Matrix2::new(
            self.beta * e,
            -self.alpha * e,
            -self.alpha * e,
            self.gamma * e,
        )
    }

    /// Tilt angle of the phase-space ellipse.
    pub fn compute_rotation(&self) -> f64 {
        let zeta = self.gamma - self.beta;
        let descr = 4.0 * self.alpha * self.alpha + zeta * zeta;

        (2.0 * self.alpha).atan2(zeta + descr.sqrt())
    }

    /// Eigenvalues of the Twiss matrix in ascending order.
    ///
    /// Both are positive for a valid ellipse and their product is the Twiss
    /// determinant `beta gamma - alpha^2 = 1`.
    pub fn compute_eigenvalues(&self) -> [f64; 2] {
        let sum = self.gamma + self.beta;
        let zeta = self.gamma - self.beta;
        let descr = 4.0 * self.alpha * self.alpha + zeta * zeta;

        [0.5 * (sum - descr.sqrt()), 0.5 * (sum + descr.sqrt())]
    }

    /// Semi-axis lengths `sqrt(emittance/lambda)`, paired with
    /// [`Twiss::compute_eigenvalues`] (so the major semi-axis comes first).
    pub fn compute_semi_axes(&self) -> [f64; 2] {
        let [l1, l2] = self.compute_eigenvalues();
        [
            (self.emittance / l1).sqrt(),
            (self.emittance / l2).sqrt(),
        ]
    }

    /// Unit eigenvectors of the Twiss matrix, paired with
    /// [`Twiss::compute_eigenvalues`].
    ///
    /// An upright ellipse (alpha = 0) gets the coordinate axes exactly.
    /// Otherwise both vectors follow from the principal-axis angle
    /// `theta = atan2(2 alpha, gamma - beta) / 2`: `(cos, sin)` for the large
    /// eigenvalue and `(-sin, cos)` for the small one.
    pub fn compute_eigenvectors(&self) -> [Vector2<f64>; 2] {
        let zeta = self.gamma - self.beta;

        if self.alpha == 0.0 {
            let x_axis = Vector2::new(1.0, 0.0);
            let xp_axis = Vector2::new(0.0, 1.0);
            // gamma belongs to the x axis, beta to the x' axis
            return if self.gamma <= self.beta {
                [x_axis, xp_axis]
            } else {
                [xp_axis, x_axis]
            };
        }

        // half-angle form stays finite for arbitrarily small alpha
        let theta = 0.5 * (2.0 * self.alpha).atan2(zeta);
        let (sin, cos) = theta.sin_cos();
        let small = Vector2::new(-sin, cos);
        let large = Vector2::new(cos, sin);

        [small, large]
    }

    /// Transports the ellipse through the 2x2 transfer-matrix block `r` and
    /// scales the emittance by `emittance_ratio` (see
    /// [`crate::relativistic::adiabatic_damping`]).
    pub fn propagate(&self, r: &Matrix2<f64>, emittance_ratio: f64) -> Twiss {
        let (r11, r12, r21, r22) = (r[(0, 0)], r[(0, 1)], r[(1, 0)], r[(1, 1)]);

        let beta = r11 * r11 * self.beta - 2.0 * r11 * r12 * self.alpha + r12 * r12 * self.gamma;
        let alpha = -r11 * r21 * self.beta + (r11 * r22 + r12 * r21) * self.alpha
            - r12 * r22 * self.gamma;

        Twiss::new(alpha, beta, self.emittance * emittance_ratio)
    }
}

impl fmt::Display for Twiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "alpha: {}, beta: {}, emittance: {}",
            self.alpha, self.beta, self.emittance
        )
    }
}
