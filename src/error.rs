//! Error types shared by the orbital and Jastrow engines.

use std::error::Error;
use std::fmt;

/// Structural failures surfaced by the kernels.
///
/// Numerical domain problems (e.g. a zero electron-electron distance) are
/// caller preconditions and never show up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QmcError {
    /// Unrecognized radial/harmonics/kernel type or an inconsistent basis record.
    Configuration(String),
    /// Coordinates or tensors whose shape does not match the engine.
    Shape(String),
    /// A derivative request the selected variant cannot serve.
    UnsupportedDerivative(String),
}

impl fmt::Display for QmcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::Shape(msg) => write!(f, "Shape error: {msg}"),
            Self::UnsupportedDerivative(msg) => write!(f, "Unsupported derivative: {msg}"),
        }
    }
}

impl Error for QmcError {}

pub type Result<T> = std::result::Result<T, QmcError>;
