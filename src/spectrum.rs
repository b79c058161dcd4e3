//! Axial electric-field spectra of an RF gap.
//!
//! The gap model sees the on-axis field only through its spectrum: the Fourier
//! transform of the field restricted to the approach side (z < 0, the
//! pre-envelope) and the departure side (z > 0, the post-envelope) of the gap
//! centre, evaluated at the particle wave number k, together with their
//! derivatives in k.
//!
//! Provided models:
//! - [`ConstantSpectrum`]: k-independent envelopes with vanishing derivatives
//! - [`FieldSpectrum`]: the full-field model assembled from the transit-time
//!   factors (T, S) of the field and their quadrature (sign(z)-weighted)
//!   counterparts
//! - [`FieldSpectrum::uniform_gap`]: closed form for a hard-edge gap with a
//!   uniform field
//! - [`FieldSpectrum::partial_field`]: fits of the centred transit-time factors
//!   against particle velocity, shifted by an offset of the field centre
//!
//! # Conventions
//!
//! The field spectrum is `T(k) - i S(k)` and the quadrature spectrum
//! `Tq(k) - i Sq(k)`. The pre-envelope spectrum is half their difference and
//! the post-envelope spectrum half their sum. Fields are normalised to unit
//! integral; the gap potential carries the magnitude.

use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{LIGHT_SPEED, TWO_PI};

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_spectrum_has_no_slope() {
        let spc = ConstantSpectrum::unit();
        for k in [0.0, 1.0, 115.0, 1e4] {
            assert_eq!(spc.pre_env_spectrum(k), Complex::new(1.0, 0.0));
            assert_eq!(spc.post_env_spectrum(k), Complex::new(1.0, 0.0));
            assert_eq!(spc.dk_pre_env_spectrum(k), Complex::new(0.0, 0.0));
            assert_eq!(spc.dk_post_env_spectrum(k), Complex::new(0.0, 0.0));
        }
    }

    #[test]
    fn envelopes_sum_to_field_spectrum() {
        let spc = FieldSpectrum::uniform_gap(0.02);
        for k in [0.5, 30.0, 115.8, 400.0] {
            let sum = spc.pre_env_spectrum(k) + spc.post_env_spectrum(k);
            let fld = spc.fld_spectrum(k);
            assert_relative_eq!(sum.re, fld.re, epsilon = 1e-15);
            assert_relative_eq!(sum.im, fld.im, epsilon = 1e-15);
        }
    }

    #[test]
    fn uniform_gap_long_wavelength_limit() {
        // a particle slow compared to the gap sees the whole unit field
        let spc = FieldSpectrum::uniform_gap(0.02);
        assert_relative_eq!(spc.tz(1e-6), 1.0, epsilon = 1e-12);
        assert_relative_eq!(spc.pre_env_spectrum(1e-6).re, 0.5, epsilon = 1e-12);
        assert!(spc.sq(1e-6).abs() < 1e-8);
    }

    #[test]
    fn uniform_gap_matches_direct_integral() {
        // pre-envelope is the transform of the field over z < 0 only
        let g = 0.03;
        let k = 150.0;
        let spc = FieldSpectrum::uniform_gap(g);
        let n = 20_000;
        let dz = 0.5 * g / n as f64;
        let mut direct = Complex::new(0.0, 0.0);
        for i in 0..n {
            let z = -0.5 * g + (i as f64 + 0.5) * dz;
            direct += Complex::new(0.0, -k * z).exp() * (dz / g);
        }
        let pre = spc.pre_env_spectrum(k);
        assert_relative_eq!(pre.re, direct.re, epsilon = 1e-8);
        assert_relative_eq!(pre.im, direct.im, epsilon = 1e-8);
    }

    #[test]
    fn uniform_gap_derivatives_match_finite_differences() {
        let spc = FieldSpectrum::uniform_gap(0.02);
        let h = 1e-4;
        for k in [1e-3, 0.2, 50.0, 115.8, 333.0] {
            let fd_pre = (spc.pre_env_spectrum(k + h) - spc.pre_env_spectrum(k - h)) / (2.0 * h);
            let fd_post =
                (spc.post_env_spectrum(k + h) - spc.post_env_spectrum(k - h)) / (2.0 * h);
            let pre = spc.dk_pre_env_spectrum(k);
            let post = spc.dk_post_env_spectrum(k);
            assert!((pre - fd_pre).norm() < 1e-8, "k = {}", k);
            assert!((post - fd_post).norm() < 1e-8, "k = {}", k);
        }
    }

    #[test]
    fn model_builds_boxed_spectrum() {
        let model = SpectrumModel::Constant {
            pre: Complex::new(0.5, 0.0),
            post: Complex::new(0.5, 0.0),
        };
        let spc = model.build();
        assert_eq!(spc.pre_env_spectrum(10.0), Complex::new(0.5, 0.0));

        let model = SpectrumModel::Uniform { gap_length: 0.02 };
        let spc = model.build();
        let direct = FieldSpectrum::uniform_gap(0.02);
        assert_eq!(spc.post_env_spectrum(80.0), direct.post_env_spectrum(80.0));

        let model = SpectrumModel::Polynomial {
            frequency: FREQ,
            offset: 0.003,
            ttf: vec![0.5, 2.0],
            ttf_prime: vec![0.3],
            stf: vec![0.1, -0.4],
            stf_prime: vec![0.2],
        };
        let spc = model.build();
        let direct = FieldSpectrum::partial_field(
            FREQ,
            0.003,
            polynomial(vec![0.5, 2.0]),
            polynomial(vec![0.3]),
            polynomial(vec![0.1, -0.4]),
            polynomial(vec![0.2]),
        );
        let k = wave_number_at(0.1);
        assert_eq!(spc.pre_env_spectrum(k), direct.pre_env_spectrum(k));
        assert_eq!(spc.dk_post_env_spectrum(k), direct.dk_post_env_spectrum(k));
    }

    const FREQ: f64 = 402.5e6;

    fn wave_number_at(beta: f64) -> f64 {
        TWO_PI * FREQ / (beta * LIGHT_SPEED)
    }

    #[test]
    fn polynomial_uses_ascending_coefficients() {
        let p = polynomial(vec![1.0, -2.0, 3.0]);
        assert_eq!(p(0.0), 1.0);
        assert_eq!(p(2.0), 1.0 - 4.0 + 12.0);
        assert_eq!(polynomial(Vec::new())(5.0), 0.0);
    }

    #[test]
    fn centred_partial_field_has_no_odd_parts() {
        let spc = FieldSpectrum::partial_field(
            FREQ,
            0.0,
            polynomial(vec![0.5, 2.0]),
            polynomial(vec![0.3]),
            polynomial(vec![0.1, -0.4]),
            polynomial(vec![0.2]),
        );
        // fits are evaluated at beta = 0.1
        let k = wave_number_at(0.1);
        assert_eq!(spc.sz(k), 0.0);
        assert_eq!(spc.tq(k), 0.0);
        assert_eq!(spc.dk_sz(k), 0.0);
        assert_eq!(spc.dk_tq(k), 0.0);
        assert_relative_eq!(spc.tz(k), 0.7, max_relative = 1e-12);
        assert_relative_eq!(spc.sq(k), 0.06, max_relative = 1e-12);
        // fitted derivatives are scaled by 0.01
        assert_relative_eq!(spc.dk_tz(k), 0.003, max_relative = 1e-12);
        assert_relative_eq!(spc.dk_sq(k), 0.002, max_relative = 1e-12);
    }

    #[test]
    fn partial_field_offset_shifts_phase() {
        let offset = 0.004;
        let spc = FieldSpectrum::partial_field(
            FREQ,
            offset,
            |_| 0.8,
            |_| 0.0,
            |_| 0.3,
            |_| 0.0,
        );
        let k = 120.0;
        let (sin, cos) = (-k * offset).sin_cos();
        assert_relative_eq!(spc.tz(k), 0.8 * cos, max_relative = 1e-14);
        assert_relative_eq!(spc.sz(k), 0.8 * sin, max_relative = 1e-14);
        assert_relative_eq!(spc.tq(k), -0.3 * sin, max_relative = 1e-14);
        assert_relative_eq!(spc.sq(k), 0.3 * cos, max_relative = 1e-14);

        // with flat fits the derivatives come from the offset alone
        let h = 1e-4;
        for k in [20.0, 85.0, 120.0, 310.0] {
            let fd_pre = (spc.pre_env_spectrum(k + h) - spc.pre_env_spectrum(k - h)) / (2.0 * h);
            let fd_post =
                (spc.post_env_spectrum(k + h) - spc.post_env_spectrum(k - h)) / (2.0 * h);
            assert!((spc.dk_pre_env_spectrum(k) - fd_pre).norm() < 1e-9, "k = {}", k);
            assert!((spc.dk_post_env_spectrum(k) - fd_post).norm() < 1e-9, "k = {}", k);
        }
    }
}

/// Spectral description of the axial field of an RF gap.
pub trait AxialFieldSpectrum {
    /// Spectrum of the field on the approach side of the gap centre.
    fn pre_env_spectrum(&self, k: f64) -> Complex<f64>;

    /// Derivative of the pre-envelope spectrum w.r.t. the wave number.
    fn dk_pre_env_spectrum(&self, k: f64) -> Complex<f64>;

    /// Spectrum of the field on the departure side of the gap centre.
    fn post_env_spectrum(&self, k: f64) -> Complex<f64>;

    /// Derivative of the post-envelope spectrum w.r.t. the wave number.
    fn dk_post_env_spectrum(&self, k: f64) -> Complex<f64>;
}

impl<T: AxialFieldSpectrum + ?Sized> AxialFieldSpectrum for &T {
    fn pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).pre_env_spectrum(k)
    }

    fn dk_pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).dk_pre_env_spectrum(k)
    }

    fn post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).post_env_spectrum(k)
    }

    fn dk_post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).dk_post_env_spectrum(k)
    }
}

impl<T: AxialFieldSpectrum + ?Sized> AxialFieldSpectrum for Box<T> {
    fn pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).pre_env_spectrum(k)
    }

    fn dk_pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).dk_pre_env_spectrum(k)
    }

    fn post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).post_env_spectrum(k)
    }

    fn dk_post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (**self).dk_post_env_spectrum(k)
    }
}

/// A spectrum shared across threads.
pub type BoxedSpectrum = Box<dyn AxialFieldSpectrum + Send + Sync>;

/// Spectrum whose envelopes do not depend on the wave number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSpectrum {
    pub pre: Complex<f64>,
    pub post: Complex<f64>,
}

impl ConstantSpectrum {
    pub fn new(pre: Complex<f64>, post: Complex<f64>) -> Self {
        Self { pre, post }
    }

    /// Unit envelopes on both sides.
    pub fn unit() -> Self {
        Self::new(Complex::new(1.0, 0.0), Complex::new(1.0, 0.0))
    }

    /// A gap with no field at all.
    pub fn zero() -> Self {
        Self::new(Complex::new(0.0, 0.0), Complex::new(0.0, 0.0))
    }
}

impl AxialFieldSpectrum for ConstantSpectrum {
    fn pre_env_spectrum(&self, _k: f64) -> Complex<f64> {
        self.pre
    }

    fn dk_pre_env_spectrum(&self, _k: f64) -> Complex<f64> {
        Complex::new(0.0, 0.0)
    }

    fn post_env_spectrum(&self, _k: f64) -> Complex<f64> {
        self.post
    }

    fn dk_post_env_spectrum(&self, _k: f64) -> Complex<f64> {
        Complex::new(0.0, 0.0)
    }
}

/// Real-valued function of the wave number.
pub type RealFunction = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Cosine and sine transit-time factors with their k-derivatives.
pub struct TransitTimeFactors {
    pub t: RealFunction,
    pub dt: RealFunction,
    pub s: RealFunction,
    pub ds: RealFunction,
}

impl TransitTimeFactors {
    pub fn new(
        t: impl Fn(f64) -> f64 + Send + Sync + 'static,
        dt: impl Fn(f64) -> f64 + Send + Sync + 'static,
        s: impl Fn(f64) -> f64 + Send + Sync + 'static,
        ds: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            t: Box::new(t),
            dt: Box::new(dt),
            s: Box::new(s),
            ds: Box::new(ds),
        }
    }

    /// Factors that vanish identically.
    pub fn zero() -> Self {
        Self::new(|_| 0.0, |_| 0.0, |_| 0.0, |_| 0.0)
    }
}

/// Full-field spectrum model.
///
/// **Context**: The transit-time factors `T(k) = int E(z) cos(kz) dz` and
/// `S(k) = int E(z) sin(kz) dz` describe the whole field. Splitting the gap at
/// its centre also needs the quadrature factors `Tq`, `Sq`, the same
/// transforms of `sign(z) E(z)`.
///
/// **How it Works**: Each factor and its k-derivative is supplied as a
/// function; the envelope spectra are then
/// `(T - iS -/+ (Tq - iSq)) / 2` for the pre/post sides.
pub struct FieldSpectrum {
    primary: TransitTimeFactors,
    quadrature: TransitTimeFactors,
}

impl fmt::Debug for FieldSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpectrum").finish_non_exhaustive()
    }
}

impl FieldSpectrum {
    pub fn new(primary: TransitTimeFactors, quadrature: TransitTimeFactors) -> Self {
        Self {
            primary,
            quadrature,
        }
    }

    /// Hard-edge gap of length `gap_length` (m) with a uniform unit-integral
    /// field.
    ///
    /// With `x = k g / 2`: `T = sin(x)/x`, `S = 0`, `Tq = 0` and
    /// `Sq = (1 - cos x)/x`.
    pub fn uniform_gap(gap_length: f64) -> Self {
        let half = 0.5 * gap_length;

        let primary = TransitTimeFactors::new(
            move |k| sinc(k * half),
            move |k| half * dsinc(k * half),
            |_| 0.0,
            |_| 0.0,
        );
        let quadrature = TransitTimeFactors::new(
            |_| 0.0,
            |_| 0.0,
            move |k| cosc(k * half),
            move |k| half * dcosc(k * half),
        );

        Self::new(primary, quadrature)
    }

    /// Partial-field model of a gap whose field centre sits `offset` (m) from
    /// the gap origin.
    ///
    /// **Context**: Cavity databases tabulate the centred transit-time factors
    /// `T0` and `Sq0`, and their derivatives, as fits in the particle velocity
    /// `beta = 2 pi / (k lambda)`.
    ///
    /// **How it Works**: With `dz = -offset` the centred factors are shifted
    /// to the gap origin:
    /// - `Tz = T0 cos(k dz)`, `Sz = T0 sin(k dz)`
    /// - `Tq = -Sq0 sin(k dz)`, `Sq = Sq0 cos(k dz)`
    ///
    /// Derivatives follow by the product rule, with the fitted derivatives
    /// scaled by 0.01 as they are tabulated.
    pub fn partial_field(
        frequency: f64,
        offset: f64,
        tz0: impl Fn(f64) -> f64 + Send + Sync + 'static,
        dtz0: impl Fn(f64) -> f64 + Send + Sync + 'static,
        sq0: impl Fn(f64) -> f64 + Send + Sync + 'static,
        dsq0: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        let fits = Arc::new(CentredFits {
            wavelength: LIGHT_SPEED / frequency,
            shift: -offset,
            tz0: Box::new(tz0),
            dtz0: Box::new(dtz0),
            sq0: Box::new(sq0),
            dsq0: Box::new(dsq0),
        });
        let view = |g: fn(&CentredFits, f64) -> f64| {
            let fits = Arc::clone(&fits);
            move |k: f64| g(&*fits, k)
        };

        let primary = TransitTimeFactors::new(
            view(CentredFits::tz),
            view(CentredFits::dk_tz),
            view(CentredFits::sz),
            view(CentredFits::dk_sz),
        );
        let quadrature = TransitTimeFactors::new(
            view(CentredFits::tq),
            view(CentredFits::dk_tq),
            view(CentredFits::sq),
            view(CentredFits::dk_sq),
        );

        Self::new(primary, quadrature)
    }

    pub fn tz(&self, k: f64) -> f64 {
        (self.primary.t)(k)
    }

    pub fn dk_tz(&self, k: f64) -> f64 {
        (self.primary.dt)(k)
    }

    pub fn sz(&self, k: f64) -> f64 {
        (self.primary.s)(k)
    }

    pub fn dk_sz(&self, k: f64) -> f64 {
        (self.primary.ds)(k)
    }

    pub fn tq(&self, k: f64) -> f64 {
        (self.quadrature.t)(k)
    }

    pub fn dk_tq(&self, k: f64) -> f64 {
        (self.quadrature.dt)(k)
    }

    pub fn sq(&self, k: f64) -> f64 {
        (self.quadrature.s)(k)
    }

    pub fn dk_sq(&self, k: f64) -> f64 {
        (self.quadrature.ds)(k)
    }

    /// Spectrum of the full field, `T - iS`.
    pub fn fld_spectrum(&self, k: f64) -> Complex<f64> {
        Complex::new(self.tz(k), -self.sz(k))
    }

    pub fn dk_fld_spectrum(&self, k: f64) -> Complex<f64> {
        Complex::new(self.dk_tz(k), -self.dk_sz(k))
    }

    /// Quadrature spectrum, `Tq - iSq`.
    pub fn cnj_spectrum(&self, k: f64) -> Complex<f64> {
        Complex::new(self.tq(k), -self.sq(k))
    }

    pub fn dk_cnj_spectrum(&self, k: f64) -> Complex<f64> {
        Complex::new(self.dk_tq(k), -self.dk_sq(k))
    }
}

impl AxialFieldSpectrum for FieldSpectrum {
    fn pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (self.fld_spectrum(k) - self.cnj_spectrum(k)) / 2.0
    }

    fn dk_pre_env_spectrum(&self, k: f64) -> Complex<f64> {
        (self.dk_fld_spectrum(k) - self.dk_cnj_spectrum(k)) / 2.0
    }

    fn post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (self.fld_spectrum(k) + self.cnj_spectrum(k)) / 2.0
    }

    fn dk_post_env_spectrum(&self, k: f64) -> Complex<f64> {
        (self.dk_fld_spectrum(k) + self.dk_cnj_spectrum(k)) / 2.0
    }
}

// fitted derivatives are tabulated per cm
const FIT_DERIVATIVE_SCALE: f64 = 0.01;

/// Centred transit-time factor fits in beta, with the field-centre shift.
struct CentredFits {
    wavelength: f64,
    shift: f64,
    tz0: RealFunction,
    dtz0: RealFunction,
    sq0: RealFunction,
    dsq0: RealFunction,
}

impl CentredFits {
    fn velocity(&self, k: f64) -> f64 {
        TWO_PI / (k * self.wavelength)
    }

    fn tz(&self, k: f64) -> f64 {
        (self.tz0)(self.velocity(k)) * (k * self.shift).cos()
    }

    fn dk_tz(&self, k: f64) -> f64 {
        let beta = self.velocity(k);
        let (sin, cos) = (k * self.shift).sin_cos();
        FIT_DERIVATIVE_SCALE * (self.dtz0)(beta) * cos - (self.tz0)(beta) * self.shift * sin
    }

    fn sz(&self, k: f64) -> f64 {
        (self.tz0)(self.velocity(k)) * (k * self.shift).sin()
    }

    fn dk_sz(&self, k: f64) -> f64 {
        let beta = self.velocity(k);
        let (sin, cos) = (k * self.shift).sin_cos();
        FIT_DERIVATIVE_SCALE * (self.dtz0)(beta) * sin + (self.tz0)(beta) * self.shift * cos
    }

    fn tq(&self, k: f64) -> f64 {
        -(self.sq0)(self.velocity(k)) * (k * self.shift).sin()
    }

    fn dk_tq(&self, k: f64) -> f64 {
        let beta = self.velocity(k);
        let (sin, cos) = (k * self.shift).sin_cos();
        -FIT_DERIVATIVE_SCALE * (self.dsq0)(beta) * sin - (self.sq0)(beta) * self.shift * cos
    }

    fn sq(&self, k: f64) -> f64 {
        (self.sq0)(self.velocity(k)) * (k * self.shift).cos()
    }

    fn dk_sq(&self, k: f64) -> f64 {
        let beta = self.velocity(k);
        let (sin, cos) = (k * self.shift).sin_cos();
        FIT_DERIVATIVE_SCALE * (self.dsq0)(beta) * cos - (self.sq0)(beta) * self.shift * sin
    }
}

/// Polynomial `c0 + c1 x + c2 x^2 + ...` from ascending coefficients.
pub fn polynomial(coefficients: Vec<f64>) -> impl Fn(f64) -> f64 + Send + Sync + Clone + 'static {
    move |x| coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

// below this |x| the closed forms lose precision; use their Taylor series
const SERIES_THRESHOLD: f64 = 1e-4;

/// `sin(x)/x`
fn sinc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// d/dx of `sin(x)/x`
fn dsinc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        -x / 3.0
    } else {
        (x * x.cos() - x.sin()) / (x * x)
    }
}

/// `(1 - cos x)/x`
fn cosc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        0.5 * x - x * x * x / 24.0
    } else {
        (1.0 - x.cos()) / x
    }
}

/// d/dx of `(1 - cos x)/x`
fn dcosc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        0.5 - x * x / 8.0
    } else {
        (x * x.sin() - 1.0 + x.cos()) / (x * x)
    }
}

/// Configurable spectrum model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum SpectrumModel {
    /// k-independent envelopes.
    Constant {
        pre: Complex<f64>,
        post: Complex<f64>,
    },
    /// Hard-edge uniform-field gap of the given length (m).
    Uniform { gap_length: f64 },
    /// Partial-field model with polynomial fits in beta, coefficients in
    /// ascending order. See [`FieldSpectrum::partial_field`].
    Polynomial {
        /// RF frequency (Hz) used to convert k to beta.
        frequency: f64,
        /// Offset of the field centre from the gap origin (m).
        offset: f64,
        ttf: Vec<f64>,
        ttf_prime: Vec<f64>,
        stf: Vec<f64>,
        stf_prime: Vec<f64>,
    },
}

impl SpectrumModel {
    pub fn build(&self) -> BoxedSpectrum {
        match self {
            SpectrumModel::Constant { pre, post } => Box::new(ConstantSpectrum::new(*pre, *post)),
            SpectrumModel::Uniform { gap_length } => Box::new(FieldSpectrum::uniform_gap(*gap_length)),
            SpectrumModel::Polynomial {
                frequency,
                offset,
                ttf,
                ttf_prime,
                stf,
                stf_prime,
            } => Box::new(FieldSpectrum::partial_field(
                *frequency,
                *offset,
                polynomial(ttf.clone()),
                polynomial(ttf_prime.clone()),
                polynomial(stf.clone()),
                polynomial(stf_prime.clone()),
            )),
        }
    }
}
