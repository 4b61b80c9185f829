//! Execution configuration threaded through every engine at construction.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where the batched kernels run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// One thread, walkers processed in order.
    #[default]
    Cpu,
    /// Walkers distributed over the rayon thread pool.
    CpuParallel,
}

/// Device and precision selection for one engine instance.
///
/// All tensors are `f64`; the only selectable axis today is the device.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub device: Device,
}

impl EngineConfig {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Apply `f` to every walker index and collect the results in batch order.
    pub(crate) fn map_batch<T, F>(&self, nbatch: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self.device {
            Device::Cpu => (0..nbatch).map(f).collect(),
            Device::CpuParallel => (0..nbatch).into_par_iter().map(f).collect(),
        }
    }
}
