//! Electron-electron correlation: pair distances, Jastrow kernels and the
//! Jastrow factor built from them.

pub mod distance;
mod jastrow;
pub mod kernels;

pub use distance::{DistanceTerms, ElectronDistance, PairIndex, DEFAULT_SCALE_FACTOR};
pub use jastrow::{JastrowConfig, JastrowFactor, JastrowTensor};
pub use kernels::{
    JastrowKernel, KernelKind, KernelKwargs, PadeJastrowKernel, PadeJastrowPolynomialKernel,
};
