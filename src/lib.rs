//! Job sizing and launch-command generation for NWP benchmark runs on HPC
//! clusters.
//!
//! The crate turns a partially specified resource request ([`Job`]) into a
//! complete, consistent assignment against a node hardware description
//! ([`NodeTopology`]), and renders the result into the flag syntax of a
//! concrete cluster launcher ([`Launcher`]: srun, mpirun or aprun). The
//! assembled [`LaunchData`] performs the actual process spawn.
//!
//! Machine profiles ([`Arch`]) bundle per-system defaults (topology,
//! launcher, scheduler account/partition, environment tweaks) with
//! auto-detection, and [`LaunchConfig`] is the deserialization boundary for
//! driving the whole flow from configuration data.

pub mod arch;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod job;
pub mod launch;
pub mod topology;

// Re-exports for convenience
pub use arch::{Arch, ArchDetection, ArchJobResult, ArchRegistry};
pub use config::LaunchConfig;
pub use env::{EnvAction, EnvPipeline};
pub use errors::{ResolveError, TopologyError};
pub use exec::{ExecuteResult, execute, try_execute};
pub use job::{CpuBinding, CpuDistribution, Job};
pub use launch::{LaunchData, Launcher};
pub use topology::NodeTopology;
