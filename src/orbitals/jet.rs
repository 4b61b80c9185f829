//! Derivative requests and the per-point derivative bundle ("jet").

use std::ops::{AddAssign, BitOr, Mul};

use nalgebra::Vector3;

/// How a gradient or Laplacian is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Reduced over the spatial axis, same shape as the value.
    Summed,
    /// One entry per spatial dimension.
    PerDimension,
}

/// What the caller wants back from an orbital evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeOrder {
    Value,
    Gradient(Reduction),
    /// Summed: the Laplacian. PerDimension: the diagonal of the Hessian.
    Laplacian(Reduction),
    /// The off-diagonal Hessian entries (xy, xz, yz).
    MixedSecond,
    /// Value, per-dimension gradient and summed Laplacian in one pass.
    All,
}

impl DerivativeOrder {
    /// The intermediate quantities needed to serve this request.
    pub fn orders(&self) -> Orders {
        match self {
            Self::Value => Orders::VALUE,
            Self::Gradient(_) => Orders::VALUE | Orders::GRADIENT,
            Self::Laplacian(Reduction::Summed) | Self::All => {
                Orders::VALUE | Orders::GRADIENT | Orders::LAPLACIAN
            }
            Self::Laplacian(Reduction::PerDimension) => {
                Orders::VALUE | Orders::GRADIENT | Orders::HESSIAN_DIAG
            }
            Self::MixedSecond => Orders::VALUE | Orders::GRADIENT | Orders::HESSIAN_MIXED,
        }
    }
}

/// Bit-set of derivative orders a radial or harmonic evaluation must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orders(u8);

impl Orders {
    pub const VALUE: Orders = Orders(1);
    pub const GRADIENT: Orders = Orders(1 << 1);
    pub const LAPLACIAN: Orders = Orders(1 << 2);
    pub const HESSIAN_DIAG: Orders = Orders(1 << 3);
    pub const HESSIAN_MIXED: Orders = Orders(1 << 4);

    pub fn contains(&self, other: Orders) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any second-order quantity is requested.
    pub fn needs_second(&self) -> bool {
        self.0 & (Self::LAPLACIAN.0 | Self::HESSIAN_DIAG.0 | Self::HESSIAN_MIXED.0) != 0
    }
}

impl BitOr for Orders {
    type Output = Orders;

    fn bitor(self, rhs: Orders) -> Orders {
        Orders(self.0 | rhs.0)
    }
}

/// Value and derivatives of a scalar field at one point.
///
/// Only the fields covered by the requested [`Orders`] are meaningful; the
/// others stay zero. `hessian_mixed` holds (∂x∂y, ∂x∂z, ∂y∂z).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jet {
    pub value: f64,
    pub gradient: Vector3<f64>,
    pub laplacian: f64,
    pub hessian_diag: Vector3<f64>,
    pub hessian_mixed: Vector3<f64>,
}

impl Jet {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self { value, ..Self::default() }
    }

    /// Product rule for `self * other`.
    pub fn product(&self, other: &Jet, orders: Orders) -> Jet {
        let (r, y) = (self, other);
        let mut out = Jet::constant(r.value * y.value);
        if orders.contains(Orders::GRADIENT) {
            out.gradient = r.gradient * y.value + y.gradient * r.value;
        }
        if orders.contains(Orders::LAPLACIAN) {
            out.laplacian = r.laplacian * y.value
                + 2.0 * r.gradient.dot(&y.gradient)
                + r.value * y.laplacian;
        }
        if orders.contains(Orders::HESSIAN_DIAG) {
            out.hessian_diag = r.hessian_diag * y.value
                + 2.0 * r.gradient.component_mul(&y.gradient)
                + y.hessian_diag * r.value;
        }
        if orders.contains(Orders::HESSIAN_MIXED) {
            let (dr, dy) = (&r.gradient, &y.gradient);
            let cross = Vector3::new(
                dr.x * dy.y + dr.y * dy.x,
                dr.x * dy.z + dr.z * dy.x,
                dr.y * dy.z + dr.z * dy.y,
            );
            out.hessian_mixed = r.hessian_mixed * y.value + cross + y.hessian_mixed * r.value;
        }
        out
    }
}

impl Mul<f64> for Jet {
    type Output = Jet;

    fn mul(self, rhs: f64) -> Jet {
        Jet {
            value: self.value * rhs,
            gradient: self.gradient * rhs,
            laplacian: self.laplacian * rhs,
            hessian_diag: self.hessian_diag * rhs,
            hessian_mixed: self.hessian_mixed * rhs,
        }
    }
}

impl AddAssign for Jet {
    fn add_assign(&mut self, rhs: Jet) {
        self.value += rhs.value;
        self.gradient += rhs.gradient;
        self.laplacian += rhs.laplacian;
        self.hessian_diag += rhs.hessian_diag;
        self.hessian_mixed += rhs.hessian_mixed;
    }
}
