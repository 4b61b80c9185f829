use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::correlation::JastrowConfig;
use crate::error::{QmcError, Result};
use crate::orbitals::BasisSpec;

/// Everything needed to build the atomic orbitals and the Jastrow factor of
/// one system.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub basis: BasisSpec,
    pub jastrow: JastrowConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Walkers per batch; the command line takes precedence.
    #[serde(default)]
    pub nwalkers: Option<usize>,
}

impl RunConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|err| QmcError::Configuration(err.to_string()))
    }

    pub fn nelec(&self) -> usize {
        self.jastrow.nup + self.jastrow.ndown
    }
}

/// Read a [`RunConfig`] from a YAML file.
pub fn read_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|err| QmcError::Configuration(format!("cannot open {}: {err}", path.display())))?;
    serde_yaml::from_reader(BufReader::new(file))
        .map_err(|err| QmcError::Configuration(format!("{}: {err}", path.display())))
}
