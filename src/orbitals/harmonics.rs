//! Angular parts of the atomic orbitals: cartesian monomials and real
//! spherical harmonics up to l = 2.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::jet::{Jet, Orders};
use crate::error::{QmcError, Result};

/// Y00 = 1/2 sqrt(1/π)
const C_L0: f64 = 0.28209479177387814;
/// sqrt(3/(4π))
const C_L1: f64 = 0.4886025119029199;
/// 1/4 sqrt(5/π)
const C_L2_M0: f64 = 0.31539156525252005;
/// 1/4 sqrt(15/π)
const C_L2_M2: f64 = 0.5462742152960396;
/// 1/2 sqrt(15/π)
const C_L2_OFF: f64 = 1.0925484305920792;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicsKind {
    #[serde(rename = "cart")]
    Cartesian,
    #[serde(rename = "sph")]
    Spherical,
}

impl HarmonicsKind {
    /// Spherical harmonics only provide summed second derivatives.
    pub fn check_orders(&self, orders: Orders) -> Result<()> {
        if *self == Self::Spherical
            && (orders.contains(Orders::HESSIAN_DIAG) || orders.contains(Orders::HESSIAN_MIXED))
        {
            return Err(QmcError::UnsupportedDerivative(
                "spherical harmonics cannot return individual components of the hessian".into(),
            ));
        }
        Ok(())
    }
}

impl FromStr for HarmonicsKind {
    type Err = QmcError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cartesian),
            "sph" => Ok(Self::Spherical),
            other => Err(QmcError::Configuration(format!(
                "harmonics type should be 'cart' or 'sph', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for HarmonicsKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cartesian => write!(f, "cart"),
            Self::Spherical => write!(f, "sph"),
        }
    }
}

/// The nine real spherical harmonics with l <= 2, named by their solid
/// harmonic polynomial.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RealHarmonic {
    S,
    Py,
    Pz,
    Px,
    Dxy,
    Dyz,
    Dz2,
    Dxz,
    Dx2y2,
}

impl RealHarmonic {
    pub fn from_lm(l: u32, m: i32) -> Result<Self> {
        match (l, m) {
            (0, 0) => Ok(Self::S),
            (1, -1) => Ok(Self::Py),
            (1, 0) => Ok(Self::Pz),
            (1, 1) => Ok(Self::Px),
            (2, -2) => Ok(Self::Dxy),
            (2, -1) => Ok(Self::Dyz),
            (2, 0) => Ok(Self::Dz2),
            (2, 1) => Ok(Self::Dxz),
            (2, 2) => Ok(Self::Dx2y2),
            _ => Err(QmcError::Configuration(format!(
                "spherical harmonics are available for l <= 2 and |m| <= l, got (l={l}, m={m})"
            ))),
        }
    }

    pub fn l(&self) -> u32 {
        match self {
            Self::S => 0,
            Self::Py | Self::Pz | Self::Px => 1,
            _ => 2,
        }
    }

    pub fn m(&self) -> i32 {
        match self {
            Self::S | Self::Pz | Self::Dz2 => 0,
            Self::Py | Self::Dyz => -1,
            Self::Px | Self::Dxz => 1,
            Self::Dxy => -2,
            Self::Dx2y2 => 2,
        }
    }
}

/// Angular descriptor of one primitive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Angular {
    /// x^kx y^ky z^kz
    Cartesian { kx: u32, ky: u32, kz: u32 },
    /// Real Y_lm(x/r)
    Spherical(RealHarmonic),
}

impl Angular {
    pub fn spherical(l: u32, m: i32) -> Result<Self> {
        RealHarmonic::from_lm(l, m).map(Self::Spherical)
    }

    pub fn kind(&self) -> HarmonicsKind {
        match self {
            Self::Cartesian { .. } => HarmonicsKind::Cartesian,
            Self::Spherical(_) => HarmonicsKind::Spherical,
        }
    }

    /// Harmonic value and requested derivatives at displacement `xyz`.
    ///
    /// Spherical harmonics ignore `HESSIAN_DIAG`/`HESSIAN_MIXED`; see
    /// [`HarmonicsKind::check_orders`].
    pub fn evaluate(&self, xyz: &Vector3<f64>, orders: Orders) -> Jet {
        match *self {
            Self::Cartesian { kx, ky, kz } => cartesian(xyz, [kx, ky, kz], orders),
            Self::Spherical(harmonic) => spherical(xyz, harmonic, orders),
        }
    }
}

/// x^k by repeated multiplication; 0^0 = 1.
fn int_power(x: f64, k: u32) -> f64 {
    let mut p = 1.0;
    for _ in 0..k {
        p *= x;
    }
    p
}

/// d/dx x^k
fn d_power(x: f64, k: u32) -> f64 {
    match k {
        0 => 0.0,
        1 => 1.0,
        _ => k as f64 * int_power(x, k - 1),
    }
}

/// d²/dx² x^k
fn d2_power(x: f64, k: u32) -> f64 {
    match k {
        0 | 1 => 0.0,
        2 => 2.0,
        _ => (k * (k - 1)) as f64 * int_power(x, k - 2),
    }
}

fn cartesian(xyz: &Vector3<f64>, k: [u32; 3], orders: Orders) -> Jet {
    let p = [int_power(xyz.x, k[0]), int_power(xyz.y, k[1]), int_power(xyz.z, k[2])];
    let mut jet = Jet::constant(p[0] * p[1] * p[2]);

    if orders.contains(Orders::GRADIENT) || orders.contains(Orders::HESSIAN_MIXED) {
        let dp = [d_power(xyz.x, k[0]), d_power(xyz.y, k[1]), d_power(xyz.z, k[2])];
        jet.gradient = Vector3::new(dp[0] * p[1] * p[2], p[0] * dp[1] * p[2], p[0] * p[1] * dp[2]);
        if orders.contains(Orders::HESSIAN_MIXED) {
            jet.hessian_mixed = Vector3::new(
                dp[0] * dp[1] * p[2],
                dp[0] * p[1] * dp[2],
                p[0] * dp[1] * dp[2],
            );
        }
    }
    if orders.contains(Orders::LAPLACIAN) || orders.contains(Orders::HESSIAN_DIAG) {
        let d2p = [d2_power(xyz.x, k[0]), d2_power(xyz.y, k[1]), d2_power(xyz.z, k[2])];
        let diag = Vector3::new(
            d2p[0] * p[1] * p[2],
            p[0] * d2p[1] * p[2],
            p[0] * p[1] * d2p[2],
        );
        jet.laplacian = diag.sum();
        if orders.contains(Orders::HESSIAN_DIAG) {
            jet.hessian_diag = diag;
        }
    }
    jet
}

/// Prefactor, homogeneous polynomial P of degree l and its gradient, so that
/// Y_lm = c P / r^l.
fn spherical_polynomial(harmonic: RealHarmonic, xyz: &Vector3<f64>) -> (f64, f64, Vector3<f64>) {
    use RealHarmonic as H;
    let (x, y, z) = (xyz.x, xyz.y, xyz.z);
    match harmonic {
        H::S => (C_L0, 1.0, Vector3::zeros()),
        H::Py => (C_L1, y, Vector3::y()),
        H::Pz => (C_L1, z, Vector3::z()),
        H::Px => (C_L1, x, Vector3::x()),
        H::Dxy => (C_L2_OFF, x * y, Vector3::new(y, x, 0.0)),
        H::Dyz => (C_L2_OFF, y * z, Vector3::new(0.0, z, y)),
        H::Dz2 => (
            C_L2_M0,
            2.0 * z * z - x * x - y * y,
            Vector3::new(-2.0 * x, -2.0 * y, 4.0 * z),
        ),
        H::Dxz => (C_L2_OFF, z * x, Vector3::new(z, 0.0, x)),
        H::Dx2y2 => (C_L2_M2, x * x - y * y, Vector3::new(2.0 * x, -2.0 * y, 0.0)),
    }
}

/// Y = c P / r^l
/// ∇Y = c (∇P / r^l - l P x / r^(l+2))
/// ∇²Y = -l (l+1) Y / r²
fn spherical(xyz: &Vector3<f64>, harmonic: RealHarmonic, orders: Orders) -> Jet {
    let l = harmonic.l();
    if l == 0 {
        return Jet::constant(C_L0);
    }
    let (c, poly, grad_poly) = spherical_polynomial(harmonic, xyz);
    let r2 = xyz.norm_squared();
    let rl = int_power(r2.sqrt(), l);
    let mut jet = Jet::constant(c * poly / rl);
    if orders.contains(Orders::GRADIENT) {
        jet.gradient = (grad_poly - xyz * (l as f64 * poly / r2)) * (c / rl);
    }
    if orders.contains(Orders::LAPLACIAN) {
        jet.laplacian = -((l * (l + 1)) as f64) * jet.value / r2;
    }
    jet
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_orders() -> Orders {
        Orders::VALUE
            | Orders::GRADIENT
            | Orders::LAPLACIAN
            | Orders::HESSIAN_DIAG
            | Orders::HESSIAN_MIXED
    }

    fn spherical_set() -> Vec<Angular> {
        let mut set = vec![];
        for l in 0..=2u32 {
            for m in -(l as i32)..=(l as i32) {
                set.push(Angular::spherical(l, m).unwrap());
            }
        }
        set
    }

    fn cartesian_set() -> Vec<Angular> {
        let mut set = vec![];
        for kx in 0..3 {
            for ky in 0..3 {
                for kz in 0..3 {
                    set.push(Angular::Cartesian { kx, ky, kz });
                }
            }
        }
        set
    }

    #[test]
    fn test_harmonics_kind_parsing() {
        assert_eq!("cart".parse::<HarmonicsKind>().unwrap(), HarmonicsKind::Cartesian);
        assert_eq!("sph".parse::<HarmonicsKind>().unwrap(), HarmonicsKind::Spherical);
        assert!("cartesian".parse::<HarmonicsKind>().is_err());
        assert!(Angular::spherical(3, 0).is_err());
        assert!(Angular::spherical(1, -2).is_err());
        assert!(Angular::spherical(2, 3).is_err());
    }

    #[test]
    fn test_spherical_rejects_individual_hessian() {
        let kind = HarmonicsKind::Spherical;
        assert!(kind.check_orders(Orders::VALUE | Orders::LAPLACIAN).is_ok());
        assert!(matches!(
            kind.check_orders(Orders::HESSIAN_DIAG),
            Err(QmcError::UnsupportedDerivative(_))
        ));
        assert!(HarmonicsKind::Cartesian.check_orders(all_orders()).is_ok());
    }

    #[test]
    fn test_spherical_constants() {
        let xyz = Vector3::new(0.0, 0.0, 2.0);
        let y00 = Angular::spherical(0, 0).unwrap().evaluate(&xyz, all_orders());
        assert_relative_eq!(y00.value, 0.28209479177387814);
        assert_relative_eq!(y00.gradient.norm(), 0.0);
        let y10 = Angular::spherical(1, 0).unwrap().evaluate(&xyz, Orders::VALUE);
        assert_relative_eq!(y10.value, 0.4886025119029199);
        let y20 = Angular::spherical(2, 0).unwrap().evaluate(&xyz, Orders::VALUE);
        assert_relative_eq!(y20.value, 2.0 * 0.31539156525252005);
        let diag = Vector3::new(1.0, 1.0, 0.0);
        let y2m2 = Angular::spherical(2, -2).unwrap().evaluate(&diag, Orders::VALUE);
        assert_relative_eq!(y2m2.value, 0.5 * 1.0925484305920792);
        let y22 = Angular::spherical(2, 2).unwrap().evaluate(&Vector3::x(), Orders::VALUE);
        assert_relative_eq!(y22.value, 0.5462742152960396);
    }

    #[test]
    fn test_l1_m_convention() {
        let xyz = Vector3::new(0.2, 0.5, 0.7);
        let r = xyz.norm();
        for (m, comp) in [(-1, 1usize), (0, 2), (1, 0)] {
            let y = Angular::spherical(1, m).unwrap().evaluate(&xyz, Orders::VALUE);
            assert_relative_eq!(y.value, C_L1 * xyz[comp] / r, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_cartesian_monomial_and_zero_exponents() {
        let xyz = Vector3::new(0.0, -1.5, 2.0);
        let s = Angular::Cartesian { kx: 0, ky: 0, kz: 0 }.evaluate(&xyz, all_orders());
        assert_eq!(s.value, 1.0);
        assert_eq!(s.gradient, Vector3::zeros());
        let d = Angular::Cartesian { kx: 2, ky: 1, kz: 0 }.evaluate(&xyz, all_orders());
        assert_eq!(d.value, 0.0);
        assert_relative_eq!(d.hessian_diag.x, 2.0 * -1.5);
        assert_relative_eq!(d.laplacian, -3.0);
    }

    #[test]
    fn test_harmonics_finite_difference() {
        let h = 1e-5;
        let points = [Vector3::new(0.3, -0.7, 1.1), Vector3::new(-1.2, 0.4, 0.5)];
        for angular in spherical_set().into_iter().chain(cartesian_set()) {
            let value = |p: &Vector3<f64>| angular.evaluate(p, Orders::VALUE).value;
            for xyz in &points {
                let jet = angular.evaluate(xyz, Orders::VALUE | Orders::GRADIENT | Orders::LAPLACIAN);
                let f0 = value(xyz);
                let mut lap = 0.0;
                for axis in 0..3 {
                    let mut fwd = *xyz;
                    let mut bwd = *xyz;
                    fwd[axis] += h;
                    bwd[axis] -= h;
                    let fd = (value(&fwd) - value(&bwd)) / (2.0 * h);
                    assert_relative_eq!(jet.gradient[axis], fd, epsilon = 1e-7, max_relative = 1e-3);

                    let mut fwd = *xyz;
                    let mut bwd = *xyz;
                    fwd[axis] += 1e-3;
                    bwd[axis] -= 1e-3;
                    lap += (value(&fwd) - 2.0 * f0 + value(&bwd)) / 1e-6;
                }
                assert_relative_eq!(jet.laplacian, lap, epsilon = 1e-4, max_relative = 5e-3);
            }
        }
    }

    #[test]
    fn test_cartesian_mixed_finite_difference() {
        let h = 1e-4;
        let xyz = Vector3::new(0.6, -0.9, 1.3);
        for angular in cartesian_set() {
            let value = |p: &Vector3<f64>| angular.evaluate(p, Orders::VALUE).value;
            let jet = angular.evaluate(&xyz, all_orders());
            for (slot, (i, j)) in [(0usize, 1usize), (0, 2), (1, 2)].into_iter().enumerate() {
                let shifted = |si: f64, sj: f64| {
                    let mut p = xyz;
                    p[i] += si * h;
                    p[j] += sj * h;
                    value(&p)
                };
                let fd = (shifted(1.0, 1.0) - shifted(1.0, -1.0) - shifted(-1.0, 1.0)
                    + shifted(-1.0, -1.0))
                    / (4.0 * h * h);
                assert_relative_eq!(jet.hessian_mixed[slot], fd, epsilon = 1e-5, max_relative = 5e-3);
            }
        }
    }

    #[test]
    fn test_real_harmonic_quantum_numbers() {
        for l in 0..=2u32 {
            for m in -(l as i32)..=(l as i32) {
                let harmonic = RealHarmonic::from_lm(l, m).unwrap();
                assert_eq!((harmonic.l(), harmonic.m()), (l, m));
                assert_eq!(Angular::spherical(l, m).unwrap(), Angular::Spherical(harmonic));
            }
        }
        assert!(matches!(RealHarmonic::from_lm(0, 1), Err(QmcError::Configuration(_))));
    }
}
