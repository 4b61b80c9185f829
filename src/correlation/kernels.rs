//! Electron-electron Jastrow kernels u(r).
//!
//! A kernel is a scalar function of one (possibly rescaled) pair distance.
//! The array methods apply it to all unique pairs of a batch and propagate the
//! chain rule through the pair-distance derivatives.

use std::fmt;

use ndarray::{Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use super::distance::PairIndex;
use crate::error::{QmcError, Result};

/// Cusp weight for parallel spins.
const SAME_SPIN_WEIGHT: f64 = 0.25;
/// Cusp weight for antiparallel spins.
const OPPOSITE_SPIN_WEIGHT: f64 = 0.5;

/// Per-pair cusp weights, in [`PairIndex`] order. Electrons `0..nup` are
/// spin up, the rest spin down.
pub fn spin_weights(nup: usize, pairs: &PairIndex) -> Vec<f64> {
    pairs
        .pairs()
        .map(|(i, j)| {
            if (i < nup) == (j < nup) {
                SAME_SPIN_WEIGHT
            } else {
                OPPOSITE_SPIN_WEIGHT
            }
        })
        .collect()
}

pub trait JastrowKernel: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// u(r) for pair `pair`.
    fn pair_value(&self, r: f64, pair: usize) -> f64;

    /// du/dr
    fn pair_derivative(&self, r: f64, pair: usize) -> f64;

    /// d²u/dr²
    fn pair_second_derivative(&self, r: f64, pair: usize) -> f64;

    /// Trainable parameters as a flat vector.
    fn params(&self) -> Vec<f64>;

    fn set_params(&mut self, params: &[f64]) -> Result<()>;

    /// u over unique pairs, (nbatch, npairs).
    fn value(&self, r: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn(r.raw_dim(), |(b, p)| self.pair_value(r[[b, p]], p))
    }

    /// u'(r) ∂r/∂x_k, (nbatch, 3, npairs).
    fn derivative(&self, r: &Array2<f64>, dr: &Array3<f64>) -> Array3<f64> {
        let mut out = dr.clone();
        for (mut slab, r_b) in out.outer_iter_mut().zip(r.outer_iter()) {
            for (p, mut lane) in slab.axis_iter_mut(Axis(1)).enumerate() {
                let du = self.pair_derivative(r_b[p], p);
                lane.mapv_inplace(|d| du * d);
            }
        }
        out
    }

    /// u''(r) (∂r/∂x_k)² + u'(r) ∂²r/∂x_k², (nbatch, 3, npairs).
    fn second_derivative(&self, r: &Array2<f64>, dr: &Array3<f64>, d2r: &Array3<f64>) -> Array3<f64> {
        let mut out = Array3::zeros(dr.raw_dim());
        Zip::indexed(&mut out)
            .and(dr)
            .and(d2r)
            .for_each(|(b, _, p), o, &d, &d2| {
                let rp = r[[b, p]];
                *o = self.pair_second_derivative(rp, p) * d * d + self.pair_derivative(rp, p) * d2;
            });
        out
    }
}

/// Padé kernel u = a r / (1 + w r), with the cusp weight a fixed by the
/// pair's spins and a single trainable w.
#[derive(Debug, Clone, PartialEq)]
pub struct PadeJastrowKernel {
    weights: Vec<f64>,
    w: f64,
}

impl PadeJastrowKernel {
    pub fn new(nup: usize, ndown: usize, w: f64) -> Self {
        let pairs = PairIndex::new(nup + ndown);
        Self { weights: spin_weights(nup, &pairs), w }
    }

    pub fn w(&self) -> f64 {
        self.w
    }
}

impl JastrowKernel for PadeJastrowKernel {
    fn name(&self) -> &'static str {
        "PadeJastrowKernel"
    }

    fn pair_value(&self, r: f64, pair: usize) -> f64 {
        self.weights[pair] * r / (1.0 + self.w * r)
    }

    fn pair_derivative(&self, r: f64, pair: usize) -> f64 {
        let denom = 1.0 + self.w * r;
        self.weights[pair] / (denom * denom)
    }

    fn pair_second_derivative(&self, r: f64, pair: usize) -> f64 {
        let denom = 1.0 + self.w * r;
        -2.0 * self.weights[pair] * self.w / (denom * denom * denom)
    }

    fn params(&self) -> Vec<f64> {
        vec![self.w]
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        match params {
            [w] => {
                self.w = *w;
                Ok(())
            }
            _ => Err(QmcError::Shape(format!(
                "Pade kernel has 1 parameter, got {}",
                params.len()
            ))),
        }
    }
}

/// Padé polynomial kernel
///
/// u = (a r + Σ_{k=2..K} α_k r^k) / (1 + Σ_{k=1..K} β_k r^k)
///
/// `weight_a` holds α_2..α_K and `weight_b` holds β_1..β_K.
#[derive(Debug, Clone, PartialEq)]
pub struct PadeJastrowPolynomialKernel {
    weights: Vec<f64>,
    order: usize,
    weight_a: Vec<f64>,
    weight_b: Vec<f64>,
}

/// (p, p', p'') of Σ_i c_i r^(i + offset).
fn power_series(coeffs: &[f64], offset: usize, r: f64) -> (f64, f64, f64) {
    coeffs.iter().enumerate().fold((0.0, 0.0, 0.0), |(p, dp, d2p), (i, &c)| {
        let k = (i + offset) as i32;
        let kf = k as f64;
        let d1 = if k >= 1 { kf * r.powi(k - 1) } else { 0.0 };
        let d2 = if k >= 2 { kf * (kf - 1.0) * r.powi(k - 2) } else { 0.0 };
        (p + c * r.powi(k), dp + c * d1, d2p + c * d2)
    })
}

impl PadeJastrowPolynomialKernel {
    /// Defaults are α = 0 and β = (1, 0, ...), which reduces to the Padé
    /// kernel with w = 1.
    pub fn new(
        nup: usize,
        ndown: usize,
        order: usize,
        weight_a: Option<Vec<f64>>,
        weight_b: Option<Vec<f64>>,
    ) -> Result<Self> {
        if order < 1 {
            return Err(QmcError::Configuration(
                "Pade polynomial kernel needs order >= 1".into(),
            ));
        }
        let weight_a = weight_a.unwrap_or_else(|| vec![0.0; order - 1]);
        let weight_b = weight_b.unwrap_or_else(|| {
            let mut b = vec![0.0; order];
            b[0] = 1.0;
            b
        });
        if weight_a.len() != order - 1 || weight_b.len() != order {
            return Err(QmcError::Configuration(format!(
                "order {order} needs {} numerator and {order} denominator weights, got {} and {}",
                order - 1,
                weight_a.len(),
                weight_b.len()
            )));
        }
        let pairs = PairIndex::new(nup + ndown);
        Ok(Self { weights: spin_weights(nup, &pairs), order, weight_a, weight_b })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// (N, N', N'', D, D', D'')
    fn fraction(&self, r: f64, pair: usize) -> ([f64; 3], [f64; 3]) {
        let a = self.weights[pair];
        let (n, dn, d2n) = power_series(&self.weight_a, 2, r);
        let (d, dd, d2d) = power_series(&self.weight_b, 1, r);
        ([a * r + n, a + dn, d2n], [1.0 + d, dd, d2d])
    }
}

impl JastrowKernel for PadeJastrowPolynomialKernel {
    fn name(&self) -> &'static str {
        "PadeJastrowPolynomialKernel"
    }

    fn pair_value(&self, r: f64, pair: usize) -> f64 {
        let ([n, ..], [d, ..]) = self.fraction(r, pair);
        n / d
    }

    fn pair_derivative(&self, r: f64, pair: usize) -> f64 {
        let ([n, dn, _], [d, dd, _]) = self.fraction(r, pair);
        (dn * d - n * dd) / (d * d)
    }

    fn pair_second_derivative(&self, r: f64, pair: usize) -> f64 {
        let ([n, dn, d2n], [d, dd, d2d]) = self.fraction(r, pair);
        (d2n * d - n * d2d) / (d * d) - 2.0 * dd * (dn * d - n * dd) / (d * d * d)
    }

    fn params(&self) -> Vec<f64> {
        self.weight_a.iter().chain(&self.weight_b).copied().collect()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        let na = self.weight_a.len();
        if params.len() != na + self.weight_b.len() {
            return Err(QmcError::Shape(format!(
                "Pade polynomial kernel of order {} has {} parameters, got {}",
                self.order,
                na + self.weight_b.len(),
                params.len()
            )));
        }
        self.weight_a.copy_from_slice(&params[..na]);
        self.weight_b.copy_from_slice(&params[na..]);
        Ok(())
    }
}

/// Optional kernel arguments, as they appear under `kernel_kwargs`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct KernelKwargs {
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub order: Option<usize>,
    #[serde(default)]
    pub weight_a: Option<Vec<f64>>,
    #[serde(default)]
    pub weight_b: Option<Vec<f64>>,
}

/// The kernel variants a Jastrow factor can be built with.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelKind {
    Pade(PadeJastrowKernel),
    PadePolynomial(PadeJastrowPolynomialKernel),
}

impl KernelKind {
    /// Build a kernel from its configuration name.
    pub fn from_name(name: &str, nup: usize, ndown: usize, kwargs: &KernelKwargs) -> Result<Self> {
        match name {
            "pade_jastrow" => Ok(Self::Pade(PadeJastrowKernel::new(nup, ndown, kwargs.w.unwrap_or(1.0)))),
            "pade_jastrow_polynomial" => Ok(Self::PadePolynomial(PadeJastrowPolynomialKernel::new(
                nup,
                ndown,
                kwargs.order.unwrap_or(2),
                kwargs.weight_a.clone(),
                kwargs.weight_b.clone(),
            )?)),
            other => Err(QmcError::Configuration(format!(
                "unknown Jastrow kernel '{other}' (pade_jastrow, pade_jastrow_polynomial)"
            ))),
        }
    }

    pub fn kernel(&self) -> &dyn JastrowKernel {
        match self {
            Self::Pade(k) => k,
            Self::PadePolynomial(k) => k,
        }
    }

    pub fn kernel_mut(&mut self) -> &mut dyn JastrowKernel {
        match self {
            Self::Pade(k) => k,
            Self::PadePolynomial(k) => k,
        }
    }
}
