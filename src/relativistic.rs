//! Relativistic parameter conversions.
//!
//! Pure functions converting between kinetic energy `W`, rest energy `Er`,
//! normalized velocity `beta` and relativistic factor `gamma`. Energies share
//! whatever unit the caller uses (eV throughout this crate).
//!
//! The top-level functions are total over `f64` and let out-of-domain input
//! (|beta| >= 1, gamma < 1, Er = 0) surface as NaN or infinity. The
//! [`checked`] module offers the same conversions returning a
//! [`DomainError`] instead.

use crate::error::DomainError;

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    const ER: f64 = 938.272e6;

    #[test]
    fn beta_gamma_round_trip() {
        for i in 1..100 {
            let beta = i as f64 / 100.0;
            let gamma = gamma_from_beta(beta);
            assert_relative_eq!(beta_from_gamma(gamma), beta, max_relative = 1e-12);
        }
    }

    #[test]
    fn gamma_from_energies_is_at_least_one() {
        for w in [0.0, 1.0, 2.5e6, 1.0e9, 1.0e12] {
            assert!(gamma_from_energies(w, ER) >= 1.0);
        }
        assert_eq!(gamma_from_energies(0.0, ER), 1.0);
    }

    #[test]
    fn proton_at_2_5_mev() {
        let w = 2.5e6;
        let gamma = gamma_from_energies(w, ER);
        let beta = beta_from_energies(w, ER);
        assert_relative_eq!(gamma, 1.002_664_5, max_relative = 1e-6);
        assert_relative_eq!(beta, 0.072_855, max_relative = 1e-4);
        assert_relative_eq!(
            momentum_from_energies(w, ER),
            beta * gamma * ER,
            max_relative = 1e-14
        );
    }

    #[test]
    fn kinetic_energy_inverts_gamma() {
        let w = 1.3e8;
        let gamma = gamma_from_energies(w, ER);
        assert_relative_eq!(kinetic_energy_from_gamma(gamma, ER), w, max_relative = 1e-12);
        let beta = beta_from_gamma(gamma);
        assert_relative_eq!(kinetic_energy_from_beta(beta, ER), w, max_relative = 1e-8);
    }

    #[test]
    fn out_of_domain_is_nan() {
        assert!(beta_from_gamma(0.5).is_nan());
        assert!(gamma_from_beta(1.5).is_nan());
        assert!(gamma_from_beta(1.0).is_infinite());
    }

    #[test]
    fn checked_rejects_out_of_domain() {
        assert_eq!(
            checked::gamma_from_beta(1.0),
            Err(DomainError::Superluminal { value: 1.0 })
        );
        assert_eq!(
            checked::beta_from_gamma(0.9),
            Err(DomainError::SubluminalGamma { value: 0.9 })
        );
        assert_eq!(
            checked::gamma_from_energies(1.0, 0.0),
            Err(DomainError::RestEnergy { value: 0.0 })
        );
        assert!(matches!(
            checked::beta_from_energies(f64::NAN, ER),
            Err(DomainError::NonFinite { name: "W", .. })
        ));
    }

    #[test]
    fn checked_agrees_with_unchecked() {
        let w = 4.0e7;
        assert_eq!(
            checked::momentum_from_energies(w, ER).unwrap(),
            momentum_from_energies(w, ER)
        );
        assert_eq!(checked::gamma_from_beta(0.3).unwrap(), gamma_from_beta(0.3));
    }

    #[test]
    fn no_gain_means_no_damping() {
        assert_eq!(adiabatic_damping(2.5e6, 0.0, ER), (1.0, 1.0));
    }

    #[test]
    fn acceleration_damps_emittance() {
        let (tran, long) = adiabatic_damping(2.5e6, 1.0e6, ER);
        assert!(tran < 1.0);
        assert!(long < tran);

        // the transverse ratio is the ratio of normalized momenta
        let p0 = momentum_from_energies(2.5e6, ER);
        let p1 = momentum_from_energies(3.5e6, ER);
        assert_relative_eq!(tran, p0 / p1, max_relative = 1e-12);
    }
}

/// Relativistic factor from normalized velocity, `1/sqrt(1 - beta^2)`.
pub fn gamma_from_beta(beta: f64) -> f64 {
    1.0 / (1.0 - beta * beta).sqrt()
}

/// Relativistic factor from kinetic and rest energies, `1 + W/Er`.
pub fn gamma_from_energies(w: f64, er: f64) -> f64 {
    1.0 + w / er
}

/// Normalized velocity from the relativistic factor, `sqrt(1 - 1/gamma^2)`.
pub fn beta_from_gamma(gamma: f64) -> f64 {
    (1.0 - 1.0 / (gamma * gamma)).sqrt()
}

/// Normalized velocity from kinetic and rest energies.
pub fn beta_from_energies(w: f64, er: f64) -> f64 {
    beta_from_gamma(gamma_from_energies(w, er))
}

/// Momentum in energy units, `beta * gamma * Er`.
pub fn momentum_from_energies(w: f64, er: f64) -> f64 {
    let gamma = gamma_from_energies(w, er);
    let beta = beta_from_gamma(gamma);
    beta * gamma * er
}

/// Kinetic energy `(gamma - 1) Er`.
pub fn kinetic_energy_from_gamma(gamma: f64, er: f64) -> f64 {
    (gamma - 1.0) * er
}

pub fn kinetic_energy_from_beta(beta: f64, er: f64) -> f64 {
    kinetic_energy_from_gamma(gamma_from_beta(beta), er)
}

/// Emittance ratios `(transverse, longitudinal)` after a particle of kinetic
/// energy `w0` gains `dw`.
///
/// With constant normalized emittance the geometric emittance shrinks as
/// `(beta0 gamma0)/(beta1 gamma1)` transversely and by an additional
/// `gamma0^2/gamma1^2` longitudinally.
pub fn adiabatic_damping(w0: f64, dw: f64, er: f64) -> (f64, f64) {
    if dw == 0.0 {
        return (1.0, 1.0);
    }

    let g0 = gamma_from_energies(w0, er);
    let b0 = beta_from_gamma(g0);
    let g1 = gamma_from_energies(w0 + dw, er);
    let b1 = beta_from_gamma(g1);

    let tran = (g0 * b0) / (g1 * b1);
    let long = tran * (g0 * g0) / (g1 * g1);

    (tran, long)
}

/// Domain-checked conversions.
pub mod checked {

    use super::DomainError;

    fn finite(name: &'static str, value: f64) -> Result<f64, DomainError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(DomainError::NonFinite { name, value })
        }
    }

    fn rest_energy(er: f64) -> Result<f64, DomainError> {
        if !er.is_finite() || er == 0.0 {
            return Err(DomainError::RestEnergy { value: er });
        }
        Ok(er)
    }

    pub fn gamma_from_beta(beta: f64) -> Result<f64, DomainError> {
        let beta = finite("beta", beta)?;
        if beta.abs() >= 1.0 {
            return Err(DomainError::Superluminal { value: beta });
        }
        Ok(super::gamma_from_beta(beta))
    }

    pub fn gamma_from_energies(w: f64, er: f64) -> Result<f64, DomainError> {
        let w = finite("W", w)?;
        let er = rest_energy(er)?;
        Ok(super::gamma_from_energies(w, er))
    }

    pub fn beta_from_gamma(gamma: f64) -> Result<f64, DomainError> {
        let gamma = finite("gamma", gamma)?;
        if gamma.abs() < 1.0 {
            return Err(DomainError::SubluminalGamma { value: gamma });
        }
        Ok(super::beta_from_gamma(gamma))
    }

    pub fn beta_from_energies(w: f64, er: f64) -> Result<f64, DomainError> {
        beta_from_gamma(gamma_from_energies(w, er)?)
    }

    pub fn momentum_from_energies(w: f64, er: f64) -> Result<f64, DomainError> {
        let gamma = gamma_from_energies(w, er)?;
        let beta = beta_from_gamma(gamma)?;
        Ok(beta * gamma * er)
    }
}
