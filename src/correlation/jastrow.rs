//! Electron-electron Jastrow factor J = exp(Σ_{i<j} u(r_ij)).
//!
//! Gradients and Laplacians are assembled from the per-pair kernel
//! derivatives by a signed scatter over the pair index: the row electron of a
//! pair sees +∂r, the column electron -∂r.

use std::fmt;

use log::debug;
use nalgebra::Vector3;
use ndarray::{Array2, Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

use super::distance::{ElectronDistance, PairIndex, DEFAULT_SCALE_FACTOR};
use super::kernels::{JastrowKernel, KernelKind, KernelKwargs};
use crate::batch::ElectronBatch;
use crate::config::EngineConfig;
use crate::error::{QmcError, Result};
use crate::orbitals::{DerivativeOrder, Orders, Reduction};
use crate::wavefunction::{MultiWfn, OptimizableWfn};

fn default_kernel() -> String {
    "pade_jastrow".to_string()
}

fn default_scale_factor() -> f64 {
    DEFAULT_SCALE_FACTOR
}

/// Jastrow factor settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JastrowConfig {
    pub nup: usize,
    pub ndown: usize,
    /// `pade_jastrow` or `pade_jastrow_polynomial`.
    #[serde(default = "default_kernel")]
    pub kernel: String,
    #[serde(default)]
    pub kernel_kwargs: KernelKwargs,
    /// Use the rescaled distance (1 - exp(-κ r)) / κ.
    #[serde(default)]
    pub scale: bool,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
}

impl JastrowConfig {
    pub fn new(nup: usize, ndown: usize) -> Self {
        Self {
            nup,
            ndown,
            kernel: default_kernel(),
            kernel_kwargs: KernelKwargs::default(),
            scale: false,
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

/// Result of a Jastrow evaluation.
///
/// `Scalar` is (nbatch, 1) for values and (nbatch, nelec) for summed
/// gradients and Laplacians; `Vector` is (nbatch, 3, nelec).
#[derive(Debug, Clone, PartialEq)]
pub enum JastrowTensor {
    Scalar(Array2<f64>),
    Vector(Array3<f64>),
    All {
        value: Array2<f64>,
        gradient: Array3<f64>,
        laplacian: Array2<f64>,
    },
}

impl JastrowTensor {
    pub fn into_scalar(self) -> Result<Array2<f64>> {
        match self {
            Self::Scalar(a) => Ok(a),
            _ => Err(QmcError::Shape("expected a two-dimensional Jastrow tensor".into())),
        }
    }

    pub fn into_vector(self) -> Result<Array3<f64>> {
        match self {
            Self::Vector(a) => Ok(a),
            _ => Err(QmcError::Shape("expected a (nbatch, 3, nelec) Jastrow tensor".into())),
        }
    }
}

/// Unique-pair distances of a batch, (nbatch, npairs) and (nbatch, 3, npairs).
struct PairTerms {
    r: Array2<f64>,
    dr: Option<Array3<f64>>,
    d2r: Option<Array3<f64>>,
}

#[derive(Debug, Clone)]
pub struct JastrowFactor {
    nup: usize,
    ndown: usize,
    kernel: KernelKind,
    distance: ElectronDistance,
    pairs: PairIndex,
}

impl JastrowFactor {
    pub fn new(config: &JastrowConfig, engine: EngineConfig) -> Result<Self> {
        let nelec = config.nup + config.ndown;
        let kernel =
            KernelKind::from_name(&config.kernel, config.nup, config.ndown, &config.kernel_kwargs)?;
        let scale_factor = config.scale.then_some(config.scale_factor);
        if let Some(kappa) = scale_factor {
            if !(kappa > 0.0) {
                return Err(QmcError::Configuration(format!(
                    "scale factor must be positive, got {kappa}"
                )));
            }
        }
        let jastrow = Self {
            nup: config.nup,
            ndown: config.ndown,
            kernel,
            distance: ElectronDistance::new(nelec, scale_factor, engine),
            pairs: PairIndex::new(nelec),
        };
        debug!("{jastrow}: {nelec} electrons, {} pairs", jastrow.pairs.npairs());
        Ok(jastrow)
    }

    pub fn nelec(&self) -> usize {
        self.nup + self.ndown
    }

    pub fn nup(&self) -> usize {
        self.nup
    }

    pub fn ndown(&self) -> usize {
        self.ndown
    }

    pub fn kernel(&self) -> &dyn JastrowKernel {
        self.kernel.kernel()
    }

    pub fn pairs(&self) -> &PairIndex {
        &self.pairs
    }

    fn pair_terms(&self, batch: &ElectronBatch, orders: Orders) -> Result<PairTerms> {
        let terms = self.distance.compute(batch, orders)?;
        let upper = |m: Option<Array4<f64>>| m.map(|m| self.pairs.extract_upper(&m)).transpose();
        Ok(PairTerms {
            r: self.pairs.extract_upper(&terms.r)?,
            dr: upper(terms.dr)?,
            d2r: upper(terms.d2r)?,
        })
    }

    /// ∇ ln J per electron, (nbatch, 3, nelec).
    fn log_gradient(&self, r: &Array2<f64>, dr: &Array3<f64>) -> Result<Array3<f64>> {
        self.pairs.scatter(&self.kernel().derivative(r, dr), -1.0)
    }

    pub fn evaluate(&self, batch: &ElectronBatch, order: DerivativeOrder) -> Result<JastrowTensor> {
        if matches!(order, DerivativeOrder::Laplacian(Reduction::PerDimension) | DerivativeOrder::MixedSecond) {
            return Err(QmcError::UnsupportedDerivative(format!(
                "the Jastrow factor provides values, gradients and Laplacians, not {order:?}"
            )));
        }
        let orders = order.orders();
        let terms = self.pair_terms(batch, orders)?;
        let kernel = self.kernel();

        let r = &terms.r;
        let value = kernel
            .value(r)
            .sum_axis(Axis(1))
            .mapv(f64::exp)
            .insert_axis(Axis(1));
        if order == DerivativeOrder::Value {
            return Ok(JastrowTensor::Scalar(value));
        }

        let dr = terms
            .dr
            .as_ref()
            .ok_or_else(|| QmcError::Shape("pair distance derivatives missing".into()))?;
        let grad_log = self.log_gradient(r, dr)?;
        let gradient = &grad_log * &value.view().insert_axis(Axis(2));

        let laplacian = if orders.contains(Orders::LAPLACIAN) {
            let d2r = terms
                .d2r
                .as_ref()
                .ok_or_else(|| QmcError::Shape("pair distance second derivatives missing".into()))?;
            let direct = self.pairs.scatter(&kernel.second_derivative(r, dr, d2r), 1.0)?;
            let lap_log = direct.sum_axis(Axis(1)) + grad_log.mapv(|g| g * g).sum_axis(Axis(1));
            Some(lap_log * &value)
        } else {
            None
        };

        Ok(match (order, laplacian) {
            (DerivativeOrder::Gradient(Reduction::Summed), _) => {
                JastrowTensor::Scalar(gradient.sum_axis(Axis(1)))
            }
            (DerivativeOrder::Gradient(Reduction::PerDimension), _) => JastrowTensor::Vector(gradient),
            (DerivativeOrder::All, Some(laplacian)) => JastrowTensor::All {
                value,
                gradient,
                laplacian,
            },
            (_, Some(laplacian)) => JastrowTensor::Scalar(laplacian),
            (_, None) => {
                return Err(QmcError::UnsupportedDerivative(format!("{order:?}")));
            }
        })
    }

    /// J per walker, (nbatch, 1).
    pub fn value(&self, batch: &ElectronBatch) -> Result<Array2<f64>> {
        self.evaluate(batch, DerivativeOrder::Value)?.into_scalar()
    }

    /// ∇_i J, (nbatch, 3, nelec).
    pub fn gradient(&self, batch: &ElectronBatch) -> Result<Array3<f64>> {
        self.evaluate(batch, DerivativeOrder::Gradient(Reduction::PerDimension))?
            .into_vector()
    }

    /// ∇²_i J per electron, (nbatch, nelec).
    pub fn laplacian(&self, batch: &ElectronBatch) -> Result<Array2<f64>> {
        self.evaluate(batch, DerivativeOrder::Laplacian(Reduction::Summed))?
            .into_scalar()
    }

    /// Σ_i ∇²_i J, (nbatch, 1).
    pub fn total_laplacian(&self, batch: &ElectronBatch) -> Result<Array2<f64>> {
        Ok(self.laplacian(batch)?.sum_axis(Axis(1)).insert_axis(Axis(1)))
    }
}

impl fmt::Display for JastrowFactor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ee -> {}", self.kernel().name())
    }
}

impl MultiWfn for JastrowFactor {
    fn num_electrons(&self) -> usize {
        self.nelec()
    }

    fn evaluate(&self, r: &[Vector3<f64>]) -> Result<f64> {
        let batch = ElectronBatch::from_vectors(r);
        Ok(self.value(&batch)?[[0, 0]])
    }

    fn derivative(&self, r: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>> {
        let grad = self.gradient(&ElectronBatch::from_vectors(r))?;
        Ok((0..r.len())
            .map(|i| Vector3::new(grad[[0, 0, i]], grad[[0, 1, i]], grad[[0, 2, i]]))
            .collect())
    }

    fn laplacian(&self, r: &[Vector3<f64>]) -> Result<Vec<f64>> {
        let lap = JastrowFactor::laplacian(self, &ElectronBatch::from_vectors(r))?;
        Ok(lap.row(0).to_vec())
    }
}

impl OptimizableWfn for JastrowFactor {
    fn num_params(&self) -> usize {
        self.kernel().params().len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.kernel().params()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        self.kernel.kernel_mut().set_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Device;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn four_electrons() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(0.1, -0.4, 0.3),
            Vector3::new(1.2, 0.5, -0.2),
            Vector3::new(-0.7, 0.9, 0.8),
            Vector3::new(0.4, -1.1, -0.9),
        ]
    }

    fn configs() -> Vec<JastrowConfig> {
        let pade = JastrowConfig::new(2, 2);
        let scaled = JastrowConfig { scale: true, ..JastrowConfig::new(2, 2) };
        let poly = JastrowConfig {
            kernel: "pade_jastrow_polynomial".into(),
            kernel_kwargs: KernelKwargs {
                order: Some(3),
                weight_a: Some(vec![0.05, -0.02]),
                weight_b: Some(vec![0.9, 0.1, 0.02]),
                ..Default::default()
            },
            ..JastrowConfig::new(3, 1)
        };
        vec![pade, scaled, poly]
    }

    #[test]
    fn test_two_electrons_single_pair() {
        let jastrow = JastrowFactor::new(&JastrowConfig::new(1, 1), EngineConfig::default()).unwrap();
        let r = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.6, -0.8, 0.0)];
        let r12 = (r[0] - r[1]).norm();
        let expected = jastrow.kernel().pair_value(r12, 0).exp();
        assert_relative_eq!(MultiWfn::evaluate(&jastrow, &r).unwrap(), expected, epsilon = 1e-15);
        // a = 1/2 for opposite spins, w = 1
        assert_relative_eq!(expected, (0.5f64 / 2.0).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_two_electron_gradient_antisymmetry() {
        let jastrow = JastrowFactor::new(&JastrowConfig::new(1, 1), EngineConfig::default()).unwrap();
        let pos = array![[[0.2, -0.3, 0.5], [-0.4, 0.7, 0.1]], [[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]]];
        let batch = ElectronBatch::new(pos).unwrap();
        let grad = jastrow.gradient(&batch).unwrap();
        for b in 0..2 {
            for k in 0..3 {
                assert_eq!(grad[[b, k, 0]], -grad[[b, k, 1]]);
                assert!(grad[[b, k, 0]].abs() > 0.0);
            }
        }
    }

    #[test]
    fn test_output_shapes() {
        let jastrow = JastrowFactor::new(&JastrowConfig::new(2, 2), EngineConfig::default()).unwrap();
        let batch = ElectronBatch::random(5, 4, &mut rand::thread_rng());
        assert_eq!(jastrow.value(&batch).unwrap().dim(), (5, 1));
        assert_eq!(jastrow.gradient(&batch).unwrap().dim(), (5, 3, 4));
        assert_eq!(jastrow.laplacian(&batch).unwrap().dim(), (5, 4));
        assert_eq!(jastrow.total_laplacian(&batch).unwrap().dim(), (5, 1));
        let summed = jastrow
            .evaluate(&batch, DerivativeOrder::Gradient(Reduction::Summed))
            .unwrap()
            .into_scalar()
            .unwrap();
        assert_eq!(summed.dim(), (5, 4));
        let per_dim = jastrow.gradient(&batch).unwrap().sum_axis(Axis(1));
        for (a, b) in summed.iter().zip(per_dim.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_all_matches_individual_orders() {
        let jastrow = JastrowFactor::new(&configs()[1], EngineConfig::default()).unwrap();
        let batch = ElectronBatch::random(3, 4, &mut rand::thread_rng());
        let JastrowTensor::All { value, gradient, laplacian } =
            jastrow.evaluate(&batch, DerivativeOrder::All).unwrap()
        else {
            panic!("expected the full tensor set");
        };
        assert_eq!(value, jastrow.value(&batch).unwrap());
        assert_eq!(gradient, jastrow.gradient(&batch).unwrap());
        assert_eq!(laplacian, jastrow.laplacian(&batch).unwrap());
    }

    #[test]
    fn test_rejects_unsupported_orders_and_shapes() {
        let jastrow = JastrowFactor::new(&JastrowConfig::new(2, 1), EngineConfig::default()).unwrap();
        let batch = ElectronBatch::random(2, 3, &mut rand::thread_rng());
        assert!(matches!(
            jastrow.evaluate(&batch, DerivativeOrder::MixedSecond),
            Err(QmcError::UnsupportedDerivative(_))
        ));
        let wrong = ElectronBatch::random(2, 4, &mut rand::thread_rng());
        assert!(matches!(jastrow.value(&wrong), Err(QmcError::Shape(_))));
    }

    #[test]
    fn test_gradient_and_laplacian_finite_difference() {
        let r = four_electrons();
        for config in configs() {
            let jastrow = JastrowFactor::new(&config, EngineConfig::default()).unwrap();
            let grad = MultiWfn::derivative(&jastrow, &r).unwrap();
            let fd = jastrow.numerical_derivative(&r, 1e-5).unwrap();
            for (a, n) in grad.iter().zip(&fd) {
                assert_relative_eq!(*a, *n, epsilon = 1e-8, max_relative = 1e-4);
            }
            let lap = MultiWfn::laplacian(&jastrow, &r).unwrap();
            let fd = jastrow.numerical_laplacian(&r, 1e-4).unwrap();
            for (a, n) in lap.iter().zip(&fd) {
                assert_relative_eq!(*a, *n, epsilon = 1e-5, max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn test_total_laplacian_sums_electrons() {
        let jastrow = JastrowFactor::new(&configs()[0], EngineConfig::new(Device::CpuParallel)).unwrap();
        let batch = ElectronBatch::random(4, 4, &mut rand::thread_rng());
        let lap = jastrow.laplacian(&batch).unwrap();
        let total = jastrow.total_laplacian(&batch).unwrap();
        for b in 0..4 {
            assert_relative_eq!(total[[b, 0]], lap.row(b).sum(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_batch_shapes() {
        let jastrow = JastrowFactor::new(&JastrowConfig::new(2, 1), EngineConfig::default()).unwrap();
        let batch = ElectronBatch::random(0, 3, &mut rand::thread_rng());
        assert_eq!(jastrow.value(&batch).unwrap().dim(), (0, 1));
        assert_eq!(jastrow.gradient(&batch).unwrap().dim(), (0, 3, 3));
        assert_eq!(jastrow.laplacian(&batch).unwrap().dim(), (0, 3));
    }

    #[test]
    fn test_display_and_params() {
        let mut jastrow = JastrowFactor::new(&configs()[2], EngineConfig::default()).unwrap();
        assert_eq!(jastrow.to_string(), "ee -> PadeJastrowPolynomialKernel");
        assert_eq!(jastrow.num_params(), 5);
        let mut params = jastrow.get_params();
        params[0] = 0.3;
        jastrow.set_params(&params).unwrap();
        assert_eq!(jastrow.get_params(), params);

        let pade = JastrowFactor::new(&configs()[0], EngineConfig::default()).unwrap();
        assert_eq!(pade.to_string(), "ee -> PadeJastrowKernel");
    }

    #[test]
    fn test_config_from_yaml() {
        let config: JastrowConfig = serde_yaml::from_str("nup: 2\nndown: 1\n").unwrap();
        assert_eq!(config, JastrowConfig::new(2, 1));
        let yaml = "nup: 1\nndown: 1\nkernel: pade_jastrow\nkernel_kwargs:\n  w: 0.5\nscale: true\n";
        let config: JastrowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kernel_kwargs.w, Some(0.5));
        assert_eq!(config.scale_factor, DEFAULT_SCALE_FACTOR);

        let bad = JastrowConfig { kernel: "fermi".into(), ..JastrowConfig::new(1, 1) };
        assert!(matches!(
            JastrowFactor::new(&bad, EngineConfig::default()),
            Err(QmcError::Configuration(_))
        ));
    }
}
