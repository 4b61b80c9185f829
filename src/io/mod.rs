//! IO module - YAML run configuration.

mod config;

pub use config::{read_run_config, RunConfig};
