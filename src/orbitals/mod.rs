//! Atomic orbitals: radial profiles, angular harmonics, normalization and
//! contraction, evaluated for batches of electrons.

mod atomic_orbitals;
pub(crate) mod basis;
mod harmonics;
mod jet;
pub mod norm;
mod radial;

pub use atomic_orbitals::{AtomicOrbitals, ContractedOrbital, OrbitalTensor};
pub use basis::{Basis, BasisPrimitive, BasisSpec, ContractionMap};
pub use harmonics::{Angular, HarmonicsKind, RealHarmonic};
pub use jet::{DerivativeOrder, Jet, Orders, Reduction};
pub use norm::NormalizationStrategy;
pub use radial::RadialKind;
