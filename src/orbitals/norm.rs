//! Normalization constants of the primitive orbitals.

use std::f64::consts::PI;

use factorial::{DoubleFactorial, Factorial};
use log::warn;
use serde::{Deserialize, Serialize};

use super::harmonics::Angular;
use super::radial::RadialKind;
use crate::error::{QmcError, Result};

/// Where the primitive normalization constants come from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// Closed-form constants recomputed from quantum numbers and exponents.
    #[default]
    Analytic,
    /// Constants read verbatim from the basis specification (`bas_norm`).
    FromSpecification,
}

/// n! as a float; infinite once it no longer fits a u128.
pub fn factorial(n: u32) -> f64 {
    u128::from(n)
        .checked_factorial()
        .map_or(f64::INFINITY, |f| f as f64)
}

/// n!! as a float, with (-1)!! = 0!! = 1.
pub fn double_factorial(n: i64) -> f64 {
    match u128::try_from(n) {
        Ok(k) if k > 1 => k
            .checked_double_factorial()
            .map_or(f64::INFINITY, |f| f as f64),
        _ => 1.0,
    }
}

/// Normalization constant of one primitive.
///
/// `n` is the radial power: the principal exponent for spherical harmonics,
/// the extra power of r (`kr`) for cartesian ones.
pub fn primitive_norm(radial: RadialKind, angular: &Angular, n: i32, zeta: f64) -> f64 {
    match (*angular, radial.is_slater()) {
        (Angular::Spherical(_), true) => norm_slater_spherical(n, zeta),
        (Angular::Spherical(_), false) => norm_gaussian_spherical(n, zeta),
        (Angular::Cartesian { kx, ky, kz }, true) => norm_slater_cartesian([kx, ky, kz], n, zeta),
        (Angular::Cartesian { kx, ky, kz }, false) => norm_gaussian_cartesian([kx, ky, kz], zeta),
    }
}

/// (2ζ)^n sqrt(2ζ / (2n)!)
pub fn norm_slater_spherical(n: i32, zeta: f64) -> f64 {
    let n = n.max(0);
    (2.0 * zeta).powi(n) * (2.0 * zeta / factorial(2 * n as u32)).sqrt()
}

/// sqrt(2^(2n+3/2) / ((2n-1)!! sqrt(π))) ζ^((2n+1)/4), with n shifted by one.
pub fn norm_gaussian_spherical(n: i32, zeta: f64) -> f64 {
    let n = n.max(0) + 1;
    let nf = n as f64;
    let numerator = 2f64.powf(2.0 * nf + 1.5);
    let denominator = double_factorial(2 * n as i64 - 1) * PI.sqrt();
    (numerator / denominator).sqrt() * zeta.powf(0.25 * (2.0 * nf + 1.0))
}

pub fn norm_slater_cartesian(k: [u32; 3], kr: i32, zeta: f64) -> f64 {
    let [a, b, c] = k.map(|ki| ki as i64);
    let l = a + b + c + kr.max(0) as i64 + 1;
    let prefactor = 4.0 * PI * factorial(2 * l as u32) / (2.0 * zeta).powi(2 * l as i32 + 1);
    let numerator =
        double_factorial(2 * a - 1) * double_factorial(2 * b - 1) * double_factorial(2 * c - 1);
    let denominator = double_factorial(2 * (a + b + c) + 1);
    (denominator / (prefactor * numerator)).sqrt()
}

pub fn norm_gaussian_cartesian(k: [u32; 3], zeta: f64) -> f64 {
    let axis = |ki: u32| {
        (4.0 * zeta).powf(ki as f64 / 2.0) / double_factorial(2 * ki as i64 - 1).sqrt()
    };
    (2.0 * zeta / PI).powf(0.75) * axis(k[0]) * axis(k[1]) * axis(k[2])
}

/// Resolve the constants under `strategy`.
///
/// With `FromSpecification` the supplied values are used as given; any entry
/// that differs from its analytic counterpart is reported but kept.
pub fn resolve_norms(
    strategy: NormalizationStrategy,
    analytic: Vec<f64>,
    supplied: Option<&[f64]>,
) -> Result<Vec<f64>> {
    match strategy {
        NormalizationStrategy::Analytic => Ok(analytic),
        NormalizationStrategy::FromSpecification => {
            let supplied = supplied.ok_or_else(|| {
                QmcError::Configuration(
                    "normalization from specification requested but bas_norm is missing".into(),
                )
            })?;
            if supplied.len() != analytic.len() {
                return Err(QmcError::Configuration(format!(
                    "bas_norm has {} entries for {} primitives",
                    supplied.len(),
                    analytic.len()
                )));
            }
            for (i, (given, computed)) in supplied.iter().zip(analytic.iter()).enumerate() {
                if (given - computed).abs() > 1e-8 * computed.abs().max(1.0) {
                    warn!(
                        "primitive {i}: supplied norm {given:.10e} differs from analytic {computed:.10e}"
                    );
                }
            }
            Ok(supplied.to_vec())
        }
    }
}
