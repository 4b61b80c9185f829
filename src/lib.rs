//! Rust QMC kernels - batched wavefunction building blocks for Quantum Monte
//! Carlo.
//!
//! The crate evaluates two ingredients of a trial wavefunction over batches
//! of walkers: contracted atomic orbitals (Slater or Gaussian radial parts
//! with cartesian or real spherical harmonics) and the electron-electron
//! Jastrow factor, each with analytic gradients and Laplacians.

pub mod batch;
pub mod config;
pub mod correlation;
pub mod error;
pub mod io;
pub mod orbitals;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use batch::{ElectronBatch, NDIM};
pub use config::{Device, EngineConfig};
pub use correlation::{ElectronDistance, JastrowConfig, JastrowFactor, JastrowTensor, PairIndex};
pub use error::{QmcError, Result};
pub use io::{read_run_config, RunConfig};
pub use orbitals::{AtomicOrbitals, BasisSpec, DerivativeOrder, OrbitalTensor, Reduction};
pub use wavefunction::{MultiWfn, OptimizableWfn, SingleWfn};
