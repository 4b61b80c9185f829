//! Electron-electron distances, their derivatives and the unique-pair
//! bookkeeping shared by the Jastrow factor.

use ndarray::{
    stack, Array, Array2, Array3, Array4, ArrayBase, ArrayView, ArrayView2, Axis, Data, Dimension,
    IxDyn, RemoveAxis, ShapeError,
};

use crate::batch::{ElectronBatch, NDIM};
use crate::config::EngineConfig;
use crate::error::{QmcError, Result};
use crate::orbitals::Orders;

/// Default κ of the scaled distance (1 - exp(-κ r)) / κ.
pub const DEFAULT_SCALE_FACTOR: f64 = 0.6;

/// Full distance matrices of a batch.
///
/// `r` has shape (nbatch, nelec, nelec); `dr` and `d2r` hold ∂r_ij/∂x_ik and
/// ∂²r_ij/∂x_ik² with shape (nbatch, 3, nelec, nelec). Diagonals are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTerms {
    pub r: Array3<f64>,
    pub dr: Option<Array4<f64>>,
    pub d2r: Option<Array4<f64>>,
}

type WalkerTerms = (Array2<f64>, Option<Array3<f64>>, Option<Array3<f64>>);

fn shape_error(err: ShapeError) -> QmcError {
    QmcError::Shape(err.to_string())
}

/// Stack per-walker arrays along a new leading batch axis.
fn stack_walkers<D>(views: Vec<ArrayView<f64, D>>) -> Result<Array<f64, D::Larger>>
where
    D: Dimension,
    D::Larger: RemoveAxis,
{
    stack(Axis(0), &views).map_err(shape_error)
}

#[derive(Debug, Clone)]
pub struct ElectronDistance {
    nelec: usize,
    scale_factor: Option<f64>,
    engine: EngineConfig,
}

impl ElectronDistance {
    /// `scale_factor` switches on the smooth rescaling with that κ.
    pub fn new(nelec: usize, scale_factor: Option<f64>, engine: EngineConfig) -> Self {
        Self { nelec, scale_factor, engine }
    }

    pub fn nelec(&self) -> usize {
        self.nelec
    }

    pub fn scale_factor(&self) -> Option<f64> {
        self.scale_factor
    }

    fn walker_terms(&self, x: ArrayView2<f64>, orders: Orders) -> WalkerTerms {
        let n = self.nelec;
        let diff = |i: usize, j: usize, k: usize| x[[i, k]] - x[[j, k]];
        let r = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                0.0
            } else {
                (0..NDIM).map(|k| diff(i, j, k).powi(2)).sum::<f64>().sqrt()
            }
        });

        let first = orders.contains(Orders::GRADIENT) || orders.needs_second();
        let dr = first.then(|| {
            Array3::from_shape_fn((NDIM, n, n), |(k, i, j)| {
                if i == j {
                    0.0
                } else {
                    diff(i, j, k) / r[[i, j]]
                }
            })
        });
        let d2r = orders.needs_second().then(|| {
            Array3::from_shape_fn((NDIM, n, n), |(k, i, j)| {
                if i == j {
                    0.0
                } else {
                    let (rij, d) = (r[[i, j]], diff(i, j, k));
                    (rij * rij - d * d) / (rij * rij * rij)
                }
            })
        });

        let Some(kappa) = self.scale_factor else {
            return (r, dr, d2r);
        };
        // u = (1 - e)/κ, u' = r' e, u'' = (r'' - κ r'²) e with e = exp(-κ r)
        let e = r.mapv(|v| (-kappa * v).exp());
        let u = e.mapv(|ev| (1.0 - ev) / kappa);
        let d2u = match (&dr, d2r) {
            (Some(dr), Some(d2r)) => Some((d2r - &dr.mapv(|v| kappa * v * v)) * &e),
            _ => None,
        };
        let du = dr.map(|dr| dr * &e);
        (u, du, d2u)
    }

    /// Distances and the derivatives selected by `orders`.
    pub fn compute(&self, batch: &ElectronBatch, orders: Orders) -> Result<DistanceTerms> {
        batch.check_nelec(self.nelec)?;
        let first = orders.contains(Orders::GRADIENT) || orders.needs_second();
        if batch.nbatch() == 0 {
            let n = self.nelec;
            return Ok(DistanceTerms {
                r: Array3::zeros((0, n, n)),
                dr: first.then(|| Array4::zeros((0, NDIM, n, n))),
                d2r: orders.needs_second().then(|| Array4::zeros((0, NDIM, n, n))),
            });
        }
        let positions = batch.positions();
        let walkers = self
            .engine
            .map_batch(batch.nbatch(), |b| self.walker_terms(positions.index_axis(Axis(0), b), orders));

        let dr = if first {
            Some(stack_walkers(walkers.iter().filter_map(|w| w.1.as_ref()).map(|a| a.view()).collect())?)
        } else {
            None
        };
        let d2r = if orders.needs_second() {
            Some(stack_walkers(walkers.iter().filter_map(|w| w.2.as_ref()).map(|a| a.view()).collect())?)
        } else {
            None
        };
        let r = stack_walkers(walkers.iter().map(|w| w.0.view()).collect())?;
        Ok(DistanceTerms { r, dr, d2r })
    }

    pub fn distances(&self, batch: &ElectronBatch) -> Result<Array3<f64>> {
        Ok(self.compute(batch, Orders::VALUE)?.r)
    }

    pub fn first_derivative(&self, batch: &ElectronBatch) -> Result<Array4<f64>> {
        self.compute(batch, Orders::VALUE | Orders::GRADIENT)?
            .dr
            .ok_or_else(|| QmcError::Shape("no first derivative computed".into()))
    }

    pub fn second_derivative(&self, batch: &ElectronBatch) -> Result<Array4<f64>> {
        self.compute(batch, Orders::VALUE | Orders::LAPLACIAN)?
            .d2r
            .ok_or_else(|| QmcError::Shape("no second derivative computed".into()))
    }
}

/// Unique unordered electron pairs (i, j), i < j, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIndex {
    nelec: usize,
    row: Vec<usize>,
    col: Vec<usize>,
}

impl PairIndex {
    pub fn new(nelec: usize) -> Self {
        let (row, col) = (0..nelec)
            .flat_map(|i| ((i + 1)..nelec).map(move |j| (i, j)))
            .unzip();
        Self { nelec, row, col }
    }

    pub fn nelec(&self) -> usize {
        self.nelec
    }

    pub fn npairs(&self) -> usize {
        self.row.len()
    }

    pub fn row(&self) -> &[usize] {
        &self.row
    }

    pub fn col(&self) -> &[usize] {
        &self.col
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row.iter().copied().zip(self.col.iter().copied())
    }

    /// Upper-triangle entries of the trailing (nelec, nelec) block:
    /// (..., nelec, nelec) -> (..., npairs).
    pub fn extract_upper<S, D>(&self, m: &ArrayBase<S, D>) -> Result<Array<f64, D::Smaller>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let n = self.nelec;
        let shape = m.shape();
        let nd = shape.len();
        if nd < 2 || shape[nd - 1] != n || shape[nd - 2] != n {
            return Err(QmcError::Shape(format!(
                "expected trailing ({n}, {n}) block, got shape {shape:?}"
            )));
        }
        let lead = &shape[..nd - 2];
        let nlead: usize = lead.iter().product();
        let flat = m
            .as_standard_layout()
            .into_shape((nlead, n, n))
            .map_err(shape_error)?;
        let pairs = Array2::from_shape_fn((nlead, self.npairs()), |(a, p)| {
            flat[[a, self.row[p], self.col[p]]]
        });
        let mut out_shape = lead.to_vec();
        out_shape.push(self.npairs());
        pairs
            .into_shape(IxDyn(&out_shape))
            .map_err(shape_error)?
            .into_dimensionality::<D::Smaller>()
            .map_err(shape_error)
    }

    /// Scatter-add pair values along the last axis back onto electrons:
    /// (..., npairs) -> (..., nelec). The row member receives `+v`, the
    /// column member `col_sign * v`.
    pub fn scatter<S, D>(&self, values: &ArrayBase<S, D>, col_sign: f64) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let last = Axis(values.ndim().saturating_sub(1));
        if values.ndim() == 0 || values.len_of(last) != self.npairs() {
            return Err(QmcError::Shape(format!(
                "expected {} pair values along the last axis, got shape {:?}",
                self.npairs(),
                values.shape()
            )));
        }
        let mut shape = values.raw_dim();
        shape[last.index()] = self.nelec;
        let mut out = Array::zeros(shape);
        for (mut lane, v) in out.lanes_mut(last).into_iter().zip(values.lanes(last)) {
            for (p, (i, j)) in self.pairs().enumerate() {
                lane[i] += v[p];
                lane[j] += col_sign * v[p];
            }
        }
        Ok(out)
    }

    /// Rebuild (nbatch, nelec, nelec) matrices from per-pair values: entry
    /// (i, j) gets `v`, entry (j, i) gets `col_sign * v`.
    pub fn scatter_matrix(&self, values: &Array2<f64>, col_sign: f64) -> Result<Array3<f64>> {
        let (nbatch, npairs) = values.dim();
        if npairs != self.npairs() {
            return Err(QmcError::Shape(format!(
                "expected {} pair values, got {npairs}",
                self.npairs()
            )));
        }
        let mut out = Array3::zeros((nbatch, self.nelec, self.nelec));
        for b in 0..nbatch {
            for (p, (i, j)) in self.pairs().enumerate() {
                out[[b, i, j]] += values[[b, p]];
                out[[b, j, i]] += col_sign * values[[b, p]];
            }
        }
        Ok(out)
    }
}
