//! Pointwise wavefunction traits.
//!
//! `SingleWfn` views one orbital as a function of one electron position,
//! `MultiWfn` views a factor of the many-electron wavefunction as a function
//! of all electron positions. Both come with central-difference defaults used
//! to check the analytic derivatives.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::Result;

/// One-electron function (e.g. a contracted atomic orbital).
pub trait SingleWfn {
    /// Value at position `r`.
    fn evaluate(&self, r: &Vector3<f64>) -> f64;

    /// Gradient at position `r`.
    fn derivative(&self, r: &Vector3<f64>) -> Vector3<f64>;

    /// Laplacian at position `r`.
    fn laplacian(&self, r: &Vector3<f64>) -> f64;

    /// Central-difference gradient.
    fn numerical_derivative(&self, r: &Vector3<f64>, h: f64) -> Vector3<f64> {
        let mut grad = Vector3::zeros();
        for axis in 0..3 {
            let mut r_fwd = *r;
            let mut r_bwd = *r;
            r_fwd[axis] += h;
            r_bwd[axis] -= h;
            grad[axis] = (self.evaluate(&r_fwd) - self.evaluate(&r_bwd)) / (2.0 * h);
        }
        grad
    }

    /// Central-difference Laplacian.
    fn numerical_laplacian(&self, r: &Vector3<f64>, h: f64) -> f64 {
        let psi = self.evaluate(r);
        (0..3)
            .map(|axis| {
                let mut r_fwd = *r;
                let mut r_bwd = *r;
                r_fwd[axis] += h;
                r_bwd[axis] -= h;
                (self.evaluate(&r_fwd) - 2.0 * psi + self.evaluate(&r_bwd)) / (h * h)
            })
            .sum()
    }
}

/// Many-electron function evaluated on one configuration.
///
/// Every method fails with a shape error when `r.len()` differs from
/// [`MultiWfn::num_electrons`].
pub trait MultiWfn {
    fn num_electrons(&self) -> usize;

    /// Standard-normal starting positions.
    fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vector3<f64>>
    where
        Self: Sized,
    {
        (0..self.num_electrons())
            .map(|_| Vector3::from_fn(|_, _| StandardNormal.sample(&mut *rng)))
            .collect()
    }

    fn evaluate(&self, r: &[Vector3<f64>]) -> Result<f64>;

    /// Gradient with respect to each electron.
    fn derivative(&self, r: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>>;

    /// Laplacian with respect to each electron.
    fn laplacian(&self, r: &[Vector3<f64>]) -> Result<Vec<f64>>;

    fn numerical_derivative(&self, r: &[Vector3<f64>], h: f64) -> Result<Vec<Vector3<f64>>> {
        let mut grad = vec![Vector3::zeros(); r.len()];
        for i in 0..r.len() {
            for axis in 0..3 {
                let mut r_fwd = r.to_vec();
                let mut r_bwd = r.to_vec();
                r_fwd[i][axis] += h;
                r_bwd[i][axis] -= h;
                grad[i][axis] = (self.evaluate(&r_fwd)? - self.evaluate(&r_bwd)?) / (2.0 * h);
            }
        }
        Ok(grad)
    }

    fn numerical_laplacian(&self, r: &[Vector3<f64>], h: f64) -> Result<Vec<f64>> {
        let psi = self.evaluate(r)?;
        let mut laplacian = vec![0.0; r.len()];
        for i in 0..r.len() {
            for axis in 0..3 {
                let mut r_fwd = r.to_vec();
                let mut r_bwd = r.to_vec();
                r_fwd[i][axis] += h;
                r_bwd[i][axis] -= h;
                laplacian[i] +=
                    (self.evaluate(&r_fwd)? - 2.0 * psi + self.evaluate(&r_bwd)?) / (h * h);
            }
        }
        Ok(laplacian)
    }
}

/// Objects exposing trainable parameters as one flat vector.
///
/// Parameters are only changed between evaluations.
pub trait OptimizableWfn {
    fn num_params(&self) -> usize;

    fn get_params(&self) -> Vec<f64>;

    /// Fails if `params.len() != self.num_params()` or a value is out of domain.
    fn set_params(&mut self, params: &[f64]) -> Result<()>;
}
