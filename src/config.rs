//! Launch configuration envelope.
//!
//! A [`LaunchConfig`] bundles everything a benchmark run needs to size and
//! launch its executable: the target hardware topology, the (possibly
//! partial) job specification, the launcher selection and any environment
//! operations or extra flags. It is the single boundary at which
//! configuration data is deserialized.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::env::{EnvAction, EnvPipeline};
use crate::job::Job;
use crate::launch::{LaunchData, Launcher};
use crate::topology::NodeTopology;

/// Configuration for one benchmark launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    /// The hardware topology of the target nodes.
    pub topology: NodeTopology,

    /// The requested parallel resources. May be partial; it is resolved
    /// against the topology when the launch is prepared.
    #[serde(default)]
    pub job: Job,

    /// The launcher to render the job for.
    pub launcher: Launcher,

    /// Environment operations applied on top of the base environment.
    #[serde(default)]
    pub env: Vec<EnvAction>,

    /// Additional library paths appended to the library search path.
    #[serde(default)]
    pub library_paths: Vec<PathBuf>,

    /// Extra launcher flags, passed through verbatim.
    #[serde(default)]
    pub custom_flags: Vec<String>,
}

impl LaunchConfig {
    /// Parse a configuration from its JSON representation.
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Failed to parse launch configuration")
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize launch configuration")
    }

    /// Read a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read launch configuration from {:?}", path))?;
        Self::from_json_str(&data)
    }

    /// Write the configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)
            .with_context(|| format!("Failed to write launch configuration to {:?}", path))
    }

    /// Resolve the job against the topology and assemble the launch
    /// command for `cmd` in `run_dir`.
    ///
    /// The base environment for the launch is the given mapping (typically
    /// the current process environment), with the configured operations
    /// applied on top.
    pub fn prepare_launch(
        &self,
        run_dir: &Path,
        cmd: &[String],
        base_env: HashMap<String, String>,
    ) -> Result<LaunchData> {
        let job = self
            .job
            .resolve(&self.topology)
            .context("Failed to resolve job resources")?;

        let pipeline = EnvPipeline {
            actions: self.env.clone(),
            initial: base_env,
        };

        Ok(self.launcher.prepare(
            run_dir,
            &job,
            cmd,
            &self.library_paths,
            Some(pipeline),
            &self.custom_flags,
        ))
    }
}
