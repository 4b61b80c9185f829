//! Batches of electron configurations ("walkers").

use nalgebra::Vector3;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{QmcError, Result};

/// Number of spatial dimensions.
pub const NDIM: usize = 3;

/// Electron coordinates of shape (nbatch, nelec, 3).
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronBatch {
    positions: Array3<f64>,
}

impl ElectronBatch {
    pub fn new(positions: Array3<f64>) -> Result<Self> {
        if positions.shape()[2] != NDIM {
            return Err(QmcError::Shape(format!(
                "electron coordinates must have {NDIM} components, got {}",
                positions.shape()[2]
            )));
        }
        Ok(Self { positions })
    }

    /// Build from the flat (nbatch, nelec * 3) walker layout.
    pub fn from_flat(pos: ArrayView2<f64>, nelec: usize) -> Result<Self> {
        let (nbatch, ncoord) = pos.dim();
        if ncoord != nelec * NDIM {
            return Err(QmcError::Shape(format!(
                "expected {} coordinates per walker for {nelec} electrons, got {ncoord}",
                nelec * NDIM
            )));
        }
        let positions = pos
            .as_standard_layout()
            .into_owned()
            .into_shape((nbatch, nelec, NDIM))
            .map_err(|err| QmcError::Shape(err.to_string()))?;
        Ok(Self { positions })
    }

    /// A single walker given as a list of electron positions.
    pub fn from_vectors(r: &[Vector3<f64>]) -> Self {
        let positions = Array3::from_shape_fn((1, r.len(), NDIM), |(_, i, k)| r[i][k]);
        Self { positions }
    }

    /// Standard-normal random coordinates.
    pub fn random<R: Rng + ?Sized>(nbatch: usize, nelec: usize, rng: &mut R) -> Self {
        let positions = Array3::from_shape_simple_fn((nbatch, nelec, NDIM), || {
            StandardNormal.sample(&mut *rng)
        });
        Self { positions }
    }

    pub fn nbatch(&self) -> usize {
        self.positions.shape()[0]
    }

    pub fn nelec(&self) -> usize {
        self.positions.shape()[1]
    }

    pub fn positions(&self) -> ArrayView3<f64> {
        self.positions.view()
    }

    /// Coordinates of one walker, shape (nelec, 3).
    pub fn walker(&self, ibatch: usize) -> ArrayView2<f64> {
        self.positions.index_axis(Axis(0), ibatch)
    }

    /// Coordinates of one electron across the batch, shape (nbatch, 3).
    pub fn electron(&self, ielec: usize) -> ArrayView2<f64> {
        self.positions.index_axis(Axis(1), ielec)
    }

    /// Flat (nbatch, nelec * 3) layout.
    pub fn to_flat(&self) -> Array2<f64> {
        let (nbatch, nelec, _) = self.positions.dim();
        Array2::from_shape_fn((nbatch, nelec * NDIM), |(b, c)| {
            self.positions[[b, c / NDIM, c % NDIM]]
        })
    }

    /// Fail unless the batch carries exactly `nelec` electrons.
    pub fn check_nelec(&self, nelec: usize) -> Result<()> {
        if self.nelec() != nelec {
            return Err(QmcError::Shape(format!(
                "expected {nelec} electrons per walker, got {}",
                self.nelec()
            )));
        }
        Ok(())
    }
}
