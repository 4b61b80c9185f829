//! Wavefunction traits shared by the orbital and correlation engines.

mod traits;

pub use traits::{MultiWfn, OptimizableWfn, SingleWfn};
