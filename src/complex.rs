//! Complex-number helpers used by the field spectra and gap Hamiltonians.
//!
//! Arithmetic (addition, multiplication, negation, conjugation) comes from the
//! complex type re-exported by `nalgebra`. This module adds the imaginary unit
//! and Euler's formula, which the gap Hamiltonians use to build the RF phase
//! rotation factor.

use nalgebra::Complex;

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn euler_at_zero() {
        let z = euler(0.0);
        assert_eq!(z, Complex::new(1.0, 0.0));
    }

    #[test]
    fn euler_at_pi() {
        let z = euler(PI);
        assert_abs_diff_eq!(z.re, -1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(z.im, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn euler_is_unit_modulus() {
        for i in -50..=50 {
            let theta = 0.37 * i as f64;
            assert_abs_diff_eq!(euler(theta).norm(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn euler_quarter_turn_is_iunit() {
        let z = euler(FRAC_PI_2);
        assert_abs_diff_eq!(z.re, IUNIT.re, epsilon = 1e-15);
        assert_abs_diff_eq!(z.im, IUNIT.im, epsilon = 1e-15);
    }

    #[test]
    fn rotation_by_negative_iunit() {
        // (a + ib)(-i) = b - ia
        let z = Complex::new(3.0, 4.0) * -IUNIT;
        assert_eq!(z, Complex::new(4.0, -3.0));
    }

    #[test]
    fn conjugate_and_product() {
        let z = Complex::new(1.5, -2.0);
        assert_abs_diff_eq!((z * z.conj()).re, z.norm_sqr(), epsilon = 1e-14);
        assert_eq!((z * z.conj()).im, 0.0);
        assert_eq!(z + (-z), Complex::new(0.0, 0.0));
    }

    #[test]
    fn polar_construction_and_accessors() {
        use nalgebra::ComplexField;

        let z = Complex::from_polar(2.0, FRAC_PI_2);
        assert_abs_diff_eq!(z.real(), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(z.imaginary(), 2.0, epsilon = 1e-15);
        let w = euler(0.3) * 2.0;
        assert_abs_diff_eq!(w.re, Complex::from_polar(2.0, 0.3).re, epsilon = 1e-15);
        assert_abs_diff_eq!(w.im, Complex::from_polar(2.0, 0.3).im, epsilon = 1e-15);
    }

    #[test]
    fn nan_propagates() {
        let z = euler(f64::NAN);
        assert!(z.re.is_nan() && z.im.is_nan());
    }
}

/// The imaginary unit `i`.
pub const IUNIT: Complex<f64> = Complex::new(0.0, 1.0);

/// Euler's formula, `cos(theta) + i sin(theta)`.
///
/// Non-finite angles propagate as NaN components.
pub fn euler(theta: f64) -> Complex<f64> {
    let (sin, cos) = theta.sin_cos();
    Complex::new(cos, sin)
}
