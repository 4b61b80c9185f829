//! Batched evaluation of contracted atomic orbitals and their derivatives.
//!
//! Each primitive is R(r) Y(x) N c, evaluated on the displacement between an
//! electron and the primitive's center, and primitives are summed into
//! orbitals through the basis contraction map.

use std::fmt;

use log::debug;
use nalgebra::Vector3;
use ndarray::{s, Array, Array3, Array4, ArrayView2, ArrayView3, Axis, Dimension, RemoveAxis};

use super::basis::{Basis, BasisSpec};
use super::jet::{DerivativeOrder, Jet, Orders, Reduction};
use crate::batch::{ElectronBatch, NDIM};
use crate::config::EngineConfig;
use crate::error::{QmcError, Result};
use crate::wavefunction::{OptimizableWfn, SingleWfn};

/// Result of an orbital evaluation.
///
/// `Scalar` has shape (nbatch, nelec, norb); `Vector` appends the spatial
/// axis, (nbatch, nelec, norb, 3). Both carry the order they were computed
/// for.
#[derive(Debug, Clone, PartialEq)]
pub enum OrbitalTensor {
    Scalar(DerivativeOrder, Array3<f64>),
    Vector(DerivativeOrder, Array4<f64>),
    All {
        value: Array3<f64>,
        gradient: Array4<f64>,
        laplacian: Array3<f64>,
    },
}

impl OrbitalTensor {
    pub fn order(&self) -> DerivativeOrder {
        match self {
            Self::Scalar(order, _) | Self::Vector(order, _) => *order,
            Self::All { .. } => DerivativeOrder::All,
        }
    }

    pub fn scalar(&self) -> Option<&Array3<f64>> {
        match self {
            Self::Scalar(_, a) => Some(a),
            _ => None,
        }
    }

    pub fn vector(&self) -> Option<&Array4<f64>> {
        match self {
            Self::Vector(_, a) => Some(a),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Result<Array3<f64>> {
        match self {
            Self::Scalar(_, a) => Ok(a),
            _ => Err(QmcError::Shape("expected a (nbatch, nelec, norb) tensor".into())),
        }
    }

    pub fn into_vector(self) -> Result<Array4<f64>> {
        match self {
            Self::Vector(_, a) => Ok(a),
            _ => Err(QmcError::Shape("expected a (nbatch, nelec, norb, 3) tensor".into())),
        }
    }

    /// Electrons along axis 1.
    pub fn nelec(&self) -> usize {
        match self {
            Self::Scalar(_, a) => a.len_of(Axis(1)),
            Self::Vector(_, a) => a.len_of(Axis(1)),
            Self::All { value, .. } => value.len_of(Axis(1)),
        }
    }

    /// Overwrite electron `ielec` with the single-electron tensor `row`.
    fn splice(&mut self, ielec: usize, row: &OrbitalTensor) -> Result<()> {
        if self.order() != row.order() {
            return Err(QmcError::Shape(format!(
                "previous orbital tensor holds {:?}, update computed {:?}",
                self.order(),
                row.order()
            )));
        }
        match (self, row) {
            (Self::Scalar(_, a), Self::Scalar(_, r)) => splice_electron(a, ielec, r),
            (Self::Vector(_, a), Self::Vector(_, r)) => splice_electron(a, ielec, r),
            (
                Self::All { value, gradient, laplacian },
                Self::All { value: v, gradient: g, laplacian: l },
            ) => {
                splice_electron(value, ielec, v)?;
                splice_electron(gradient, ielec, g)?;
                splice_electron(laplacian, ielec, l)
            }
            _ => Err(QmcError::Shape(
                "previous orbital tensor was computed for another derivative order".into(),
            )),
        }
    }
}

fn splice_electron<D>(target: &mut Array<f64, D>, ielec: usize, row: &Array<f64, D>) -> Result<()>
where
    D: Dimension + RemoveAxis,
{
    if ielec >= target.len_of(Axis(1)) || row.len_of(Axis(1)) != 1 {
        return Err(QmcError::Shape(format!(
            "cannot splice electron {ielec} into a tensor of shape {:?}",
            target.shape()
        )));
    }
    let src = row.index_axis(Axis(1), 0);
    let mut dst = target.index_axis_mut(Axis(1), ielec);
    if dst.shape() != src.shape() {
        return Err(QmcError::Shape(format!(
            "update of shape {:?} does not match previous tensor of shape {:?}",
            row.shape(),
            target.shape()
        )));
    }
    dst.assign(&src);
    Ok(())
}

fn scalar_field<F>(jets: &[Jet], shape: (usize, usize, usize), f: F) -> Array3<f64>
where
    F: Fn(&Jet) -> f64,
{
    let (_, nelec, norb) = shape;
    Array3::from_shape_fn(shape, |(b, e, o)| f(&jets[(b * nelec + e) * norb + o]))
}

fn vector_field<F>(jets: &[Jet], shape: (usize, usize, usize), f: F) -> Array4<f64>
where
    F: Fn(&Jet) -> Vector3<f64>,
{
    let (nbatch, nelec, norb) = shape;
    Array4::from_shape_fn((nbatch, nelec, norb, NDIM), |(b, e, o, k)| {
        f(&jets[(b * nelec + e) * norb + o])[k]
    })
}

/// Reshape per-point jets into the tensor layout `order` asks for.
fn assemble(jets: &[Jet], shape: (usize, usize, usize), order: DerivativeOrder) -> OrbitalTensor {
    use DerivativeOrder as D;
    use OrbitalTensor as T;
    match order {
        D::Value => T::Scalar(order, scalar_field(jets, shape, |j| j.value)),
        D::Gradient(Reduction::Summed) => {
            T::Scalar(order, scalar_field(jets, shape, |j| j.gradient.sum()))
        }
        D::Gradient(Reduction::PerDimension) => {
            T::Vector(order, vector_field(jets, shape, |j| j.gradient))
        }
        D::Laplacian(Reduction::Summed) => T::Scalar(order, scalar_field(jets, shape, |j| j.laplacian)),
        D::Laplacian(Reduction::PerDimension) => {
            T::Vector(order, vector_field(jets, shape, |j| j.hessian_diag))
        }
        D::MixedSecond => T::Vector(order, vector_field(jets, shape, |j| j.hessian_mixed)),
        D::All => T::All {
            value: scalar_field(jets, shape, |j| j.value),
            gradient: vector_field(jets, shape, |j| j.gradient),
            laplacian: scalar_field(jets, shape, |j| j.laplacian),
        },
    }
}

/// Atomic orbitals of one basis for a fixed number of electrons.
#[derive(Debug, Clone)]
pub struct AtomicOrbitals {
    basis: Basis,
    nelec: usize,
    engine: EngineConfig,
}

impl AtomicOrbitals {
    pub fn new(spec: &BasisSpec, nelec: usize, engine: EngineConfig) -> Result<Self> {
        Ok(Self::from_basis(Basis::from_spec(spec)?, nelec, engine))
    }

    pub fn from_basis(basis: Basis, nelec: usize, engine: EngineConfig) -> Self {
        Self { basis, nelec, engine }
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn nelec(&self) -> usize {
        self.nelec
    }

    pub fn norb(&self) -> usize {
        self.basis.norb()
    }

    pub fn set_atom_coords(&mut self, coords: &[Vector3<f64>]) -> Result<()> {
        self.basis.set_atom_coords(coords)
    }

    /// Per-primitive jets at electron position `r`, normalization and
    /// contraction coefficient included.
    fn primitive_jets(&self, r: &Vector3<f64>, orders: Orders) -> Vec<Jet> {
        let displacements: Vec<Vector3<f64>> =
            self.basis.atom_coords().iter().map(|center| r - center).collect();
        let radial = self.basis.radial();
        self.basis
            .primitives()
            .iter()
            .map(|prim| {
                let xyz = &displacements[prim.center];
                let rad = radial.evaluate(xyz, prim.n, prim.exponent, orders);
                let ang = prim.angular.evaluate(xyz, orders);
                rad.product(&ang, orders) * (prim.norm * prim.coefficient)
            })
            .collect()
    }

    /// Contracted orbital jets at electron position `r`.
    fn orbital_jets(&self, r: &Vector3<f64>, orders: Orders) -> Vec<Jet> {
        self.basis.contraction().contract(&self.primitive_jets(r, orders))
    }

    /// Jet of orbital `iorb` alone.
    fn orbital_jet(&self, r: &Vector3<f64>, iorb: usize, orders: Orders) -> Jet {
        let prims = self.primitive_jets(r, orders);
        let mut jet = Jet::zeros();
        for (prim, &orb) in prims.into_iter().zip(self.basis.contraction().index()) {
            if orb == iorb {
                jet += prim;
            }
        }
        jet
    }

    fn evaluate_positions(
        &self,
        positions: ArrayView3<f64>,
        order: DerivativeOrder,
    ) -> Result<OrbitalTensor> {
        let orders = order.orders();
        self.basis.harmonics().check_orders(orders)?;

        let (nbatch, nelec, _) = positions.dim();
        let per_walker = self.engine.map_batch(nbatch, |b| {
            (0..nelec)
                .flat_map(|e| {
                    let p = positions.slice(s![b, e, ..]);
                    self.orbital_jets(&Vector3::new(p[0], p[1], p[2]), orders)
                })
                .collect::<Vec<Jet>>()
        });
        let jets: Vec<Jet> = per_walker.into_iter().flatten().collect();
        Ok(assemble(&jets, (nbatch, nelec, self.norb()), order))
    }

    /// Orbitals (or derivatives) for every electron of every walker.
    pub fn evaluate(&self, batch: &ElectronBatch, order: DerivativeOrder) -> Result<OrbitalTensor> {
        batch.check_nelec(self.nelec)?;
        debug!("{}: evaluating {:?} for {} walkers", self, order, batch.nbatch());
        self.evaluate_positions(batch.positions(), order)
    }

    /// Evaluate a single electron per walker; `pos` has shape (nbatch, 3).
    pub fn evaluate_one_electron(
        &self,
        pos: ArrayView2<f64>,
        order: DerivativeOrder,
    ) -> Result<OrbitalTensor> {
        if pos.ncols() != NDIM {
            return Err(QmcError::Shape(format!(
                "one-electron positions must have shape (nbatch, {NDIM}), got {:?}",
                pos.shape()
            )));
        }
        self.evaluate_positions(pos.insert_axis(Axis(1)), order)
    }

    /// Recompute the orbitals of electron `ielec` after it moved.
    ///
    /// `prev` must come from [`AtomicOrbitals::evaluate`] with the same
    /// `order`, otherwise a shape error is returned. Only the row of `ielec`
    /// is recomputed, from `batch`.
    pub fn update(
        &self,
        prev: &OrbitalTensor,
        batch: &ElectronBatch,
        ielec: usize,
        order: DerivativeOrder,
    ) -> Result<OrbitalTensor> {
        batch.check_nelec(self.nelec)?;
        if ielec >= self.nelec {
            return Err(QmcError::Shape(format!(
                "electron index {ielec} out of range for {} electrons",
                self.nelec
            )));
        }
        if prev.order() != order {
            return Err(QmcError::Shape(format!(
                "previous orbital tensor holds {:?}, not {order:?}",
                prev.order()
            )));
        }
        let row = self.evaluate_one_electron(batch.electron(ielec), order)?;
        let mut next = prev.clone();
        next.splice(ielec, &row)?;
        Ok(next)
    }

    pub fn values(&self, batch: &ElectronBatch) -> Result<Array3<f64>> {
        self.evaluate(batch, DerivativeOrder::Value)?.into_scalar()
    }

    /// Per-dimension gradient, shape (nbatch, nelec, norb, 3).
    pub fn gradient(&self, batch: &ElectronBatch) -> Result<Array4<f64>> {
        self.evaluate(batch, DerivativeOrder::Gradient(Reduction::PerDimension))?
            .into_vector()
    }

    pub fn laplacian(&self, batch: &ElectronBatch) -> Result<Array3<f64>> {
        self.evaluate(batch, DerivativeOrder::Laplacian(Reduction::Summed))?.into_scalar()
    }

    /// Pointwise view of one contracted orbital.
    pub fn orbital(&self, iorb: usize) -> Option<ContractedOrbital<'_>> {
        (iorb < self.norb()).then_some(ContractedOrbital { orbitals: self, iorb })
    }
}

impl fmt::Display for AtomicOrbitals {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "AtomicOrbitals({}, {}, {} -> ({}, {}))",
            self.basis.radial(),
            self.basis.harmonics(),
            self.nelec * NDIM,
            self.nelec,
            self.norb()
        )
    }
}

/// Exponents followed by contraction coefficients.
impl OptimizableWfn for AtomicOrbitals {
    fn num_params(&self) -> usize {
        2 * self.basis.nprim()
    }

    fn get_params(&self) -> Vec<f64> {
        let prims = self.basis.primitives();
        prims
            .iter()
            .map(|p| p.exponent)
            .chain(prims.iter().map(|p| p.coefficient))
            .collect()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(QmcError::Shape(format!(
                "expected {} orbital parameters, got {}",
                self.num_params(),
                params.len()
            )));
        }
        let (exponents, coefficients) = params.split_at(self.basis.nprim());
        self.basis.set_exponents(exponents)?;
        self.basis.set_coefficients(coefficients)
    }
}

/// One contracted orbital as a function of a single electron position.
#[derive(Debug, Clone, Copy)]
pub struct ContractedOrbital<'a> {
    orbitals: &'a AtomicOrbitals,
    iorb: usize,
}

impl SingleWfn for ContractedOrbital<'_> {
    fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        self.orbitals.orbital_jet(r, self.iorb, Orders::VALUE).value
    }

    fn derivative(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.orbitals.orbital_jet(r, self.iorb, Orders::VALUE | Orders::GRADIENT).gradient
    }

    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let orders = Orders::VALUE | Orders::GRADIENT | Orders::LAPLACIAN;
        self.orbitals.orbital_jet(r, self.iorb, orders).laplacian
    }
}
