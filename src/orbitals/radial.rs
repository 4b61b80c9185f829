//! Radial profiles of the atomic orbitals.
//!
//! Every profile is a function of r = |x| only, so its cartesian derivatives
//! follow from two scalars:
//!
//! a = R'(r) / r and c = (R''(r) - R'(r) / r) / r²
//!
//! ∂R/∂x_k = a x_k, ∂²R/∂x_k² = c x_k² + a, ∂²R/∂x_j∂x_k = c x_j x_k.
//!
//! Derivatives are undefined at r = 0 for the Slater forms and for
//! Gaussians with n > 0; callers must not request them there. Gaussians with
//! n = 0 are smooth at the center.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::jet::{Jet, Orders};
use crate::error::QmcError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RadialKind {
    /// r^n exp(-ζ r)
    Slater,
    /// exp(-ζ r)
    SlaterPure,
    /// r^n exp(-ζ r²)
    Gaussian,
    /// exp(-ζ r²)
    GaussianPure,
}

impl RadialKind {
    pub fn is_slater(&self) -> bool {
        matches!(self, Self::Slater | Self::SlaterPure)
    }

    /// Returns (R, R'/r, (R'' - R'/r)/r²).
    fn profile(&self, r: f64, n: i32, zeta: f64, second: bool) -> (f64, f64, f64) {
        let value = self.value(r, n, zeta);
        match self {
            Self::Slater => {
                let nf = n as f64;
                let dlog = nf / r - zeta;
                let a = dlog * value / r;
                if !second {
                    return (value, a, 0.0);
                }
                let d2 = (dlog * dlog - nf / (r * r)) * value;
                (value, a, (d2 - a) / (r * r))
            }
            Self::SlaterPure => {
                let a = -zeta * value / r;
                (value, a, (zeta * zeta * value - a) / (r * r))
            }
            Self::Gaussian if n == 0 => (value, -2.0 * zeta * value, 4.0 * zeta * zeta * value),
            Self::Gaussian => {
                let nf = n as f64;
                let dlog = nf / r - 2.0 * zeta * r;
                let a = dlog * value / r;
                if !second {
                    return (value, a, 0.0);
                }
                let d2 = (dlog * dlog - nf / (r * r) - 2.0 * zeta) * value;
                (value, a, (d2 - a) / (r * r))
            }
            Self::GaussianPure => (value, -2.0 * zeta * value, 4.0 * zeta * zeta * value),
        }
    }

    /// Radial value and requested derivatives at displacement `xyz` from the center.
    pub fn evaluate(&self, xyz: &Vector3<f64>, n: i32, zeta: f64, orders: Orders) -> Jet {
        let r = xyz.norm();
        if !orders.contains(Orders::GRADIENT) && !orders.needs_second() {
            return Jet::constant(self.value(r, n, zeta));
        }

        let (value, a, c) = self.profile(r, n, zeta, orders.needs_second());
        let mut jet = Jet::constant(value);
        jet.gradient = xyz * a;
        if orders.contains(Orders::LAPLACIAN) {
            jet.laplacian = c * r * r + 3.0 * a;
        }
        if orders.contains(Orders::HESSIAN_DIAG) {
            jet.hessian_diag = xyz.component_mul(xyz) * c + Vector3::repeat(a);
        }
        if orders.contains(Orders::HESSIAN_MIXED) {
            jet.hessian_mixed = Vector3::new(xyz.x * xyz.y, xyz.x * xyz.z, xyz.y * xyz.z) * c;
        }
        jet
    }

    /// R(r) alone; well defined at r = 0.
    pub fn value(&self, r: f64, n: i32, zeta: f64) -> f64 {
        match self {
            Self::Slater => r.powi(n) * (-zeta * r).exp(),
            Self::SlaterPure => (-zeta * r).exp(),
            Self::Gaussian => r.powi(n) * (-zeta * r * r).exp(),
            Self::GaussianPure => (-zeta * r * r).exp(),
        }
    }
}

impl FromStr for RadialKind {
    type Err = QmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sto" => Ok(Self::Slater),
            "sto_pure" => Ok(Self::SlaterPure),
            "gto" => Ok(Self::Gaussian),
            "gto_pure" => Ok(Self::GaussianPure),
            other => Err(QmcError::Configuration(format!(
                "{other} is not a valid radial type (sto, sto_pure, gto, gto_pure)"
            ))),
        }
    }
}

impl fmt::Display for RadialKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Slater => "sto",
            Self::SlaterPure => "sto_pure",
            Self::Gaussian => "gto",
            Self::GaussianPure => "gto_pure",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const KINDS: [RadialKind; 4] = [
        RadialKind::Slater,
        RadialKind::SlaterPure,
        RadialKind::Gaussian,
        RadialKind::GaussianPure,
    ];

    fn all_orders() -> Orders {
        Orders::VALUE
            | Orders::GRADIENT
            | Orders::LAPLACIAN
            | Orders::HESSIAN_DIAG
            | Orders::HESSIAN_MIXED
    }

    fn value(kind: RadialKind, xyz: &Vector3<f64>, n: i32, zeta: f64) -> f64 {
        kind.evaluate(xyz, n, zeta, Orders::VALUE).value
    }

    #[test]
    fn test_parse_radial_kind() {
        assert_eq!("sto".parse::<RadialKind>().unwrap(), RadialKind::Slater);
        assert_eq!("gto_pure".parse::<RadialKind>().unwrap(), RadialKind::GaussianPure);
        assert!(matches!("sgo".parse::<RadialKind>(), Err(QmcError::Configuration(_))));
        assert_eq!(RadialKind::SlaterPure.to_string(), "sto_pure");
    }

    #[test]
    fn test_slater_1s_on_x_axis() {
        let xyz = Vector3::new(1.0, 0.0, 0.0);
        let jet = RadialKind::Slater.evaluate(&xyz, 0, 1.0, all_orders());
        let em1 = (-1.0f64).exp();
        assert_relative_eq!(jet.value, em1, epsilon = 1e-14);
        assert_relative_eq!(jet.gradient.x, -em1, epsilon = 1e-14);
        assert_relative_eq!(jet.gradient.y, 0.0);
        // R'' + 2R'/r = (ζ² - 2ζ/r) e^{-ζr}
        assert_relative_eq!(jet.laplacian, -em1, epsilon = 1e-14);
    }

    #[test]
    fn test_radial_first_derivative_finite_difference() {
        let h = 1e-5;
        let points = [
            Vector3::new(0.3, -0.7, 1.1),
            Vector3::new(-1.4, 0.2, 0.5),
            Vector3::new(0.9, 0.9, -0.2),
        ];
        for kind in KINDS {
            for n in 0..3 {
                for zeta in [0.6, 1.3] {
                    for xyz in &points {
                        let jet = kind.evaluate(xyz, n, zeta, all_orders());
                        for axis in 0..3 {
                            let mut fwd = *xyz;
                            let mut bwd = *xyz;
                            fwd[axis] += h;
                            bwd[axis] -= h;
                            let fd = (value(kind, &fwd, n, zeta) - value(kind, &bwd, n, zeta))
                                / (2.0 * h);
                            assert_relative_eq!(
                                jet.gradient[axis],
                                fd,
                                epsilon = 1e-7,
                                max_relative = 1e-3
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_radial_second_derivatives_finite_difference() {
        let h = 1e-4;
        let xyz = Vector3::new(0.4, -0.8, 0.6);
        for kind in KINDS {
            for n in 0..3 {
                let zeta = 0.9;
                let jet = kind.evaluate(&xyz, n, zeta, all_orders());
                let f0 = value(kind, &xyz, n, zeta);
                let mut lap = 0.0;
                for axis in 0..3 {
                    let mut fwd = xyz;
                    let mut bwd = xyz;
                    fwd[axis] += h;
                    bwd[axis] -= h;
                    let d2 = (value(kind, &fwd, n, zeta) - 2.0 * f0 + value(kind, &bwd, n, zeta))
                        / (h * h);
                    assert_relative_eq!(jet.hessian_diag[axis], d2, epsilon = 1e-5, max_relative = 5e-3);
                    lap += d2;
                }
                assert_relative_eq!(jet.laplacian, lap, epsilon = 1e-5, max_relative = 5e-3);
                assert_relative_eq!(jet.laplacian, jet.hessian_diag.sum(), epsilon = 1e-12);

                // ∂²/∂x∂y by the four-point stencil
                let pairs = [(0, 1), (0, 2), (1, 2)];
                for (slot, &(i, j)) in pairs.iter().enumerate() {
                    let shifted = |si: f64, sj: f64| {
                        let mut p = xyz;
                        p[i] += si * h;
                        p[j] += sj * h;
                        value(kind, &p, n, zeta)
                    };
                    let fd = (shifted(1.0, 1.0) - shifted(1.0, -1.0) - shifted(-1.0, 1.0)
                        + shifted(-1.0, -1.0))
                        / (4.0 * h * h);
                    assert_relative_eq!(
                        jet.hessian_mixed[slot],
                        fd,
                        epsilon = 1e-5,
                        max_relative = 5e-3
                    );
                }
            }
        }
    }

    #[test]
    fn test_pure_variants_ignore_n() {
        let xyz = Vector3::new(0.5, 0.5, 0.5);
        for kind in [RadialKind::SlaterPure, RadialKind::GaussianPure] {
            let a = kind.evaluate(&xyz, 0, 1.2, all_orders());
            let b = kind.evaluate(&xyz, 3, 1.2, all_orders());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_gaussian_s_smooth_at_center() {
        let zeta = 0.7;
        let jet = RadialKind::Gaussian.evaluate(&Vector3::zeros(), 0, zeta, all_orders());
        assert_eq!(jet, RadialKind::GaussianPure.evaluate(&Vector3::zeros(), 0, zeta, all_orders()));
        assert_eq!(jet.value, 1.0);
        assert_eq!(jet.gradient, Vector3::zeros());
        assert_relative_eq!(jet.laplacian, -6.0 * zeta, epsilon = 1e-14);
        assert_relative_eq!(jet.hessian_diag, Vector3::repeat(-2.0 * zeta), epsilon = 1e-14);

        let off = Vector3::new(0.3, -0.1, 0.2);
        assert_eq!(
            RadialKind::Gaussian.evaluate(&off, 0, zeta, all_orders()),
            RadialKind::GaussianPure.evaluate(&off, 0, zeta, all_orders())
        );
    }
}
