//! Machine profiles for known HPC systems.
//!
//! A profile bundles the hardware topology of a machine with its default
//! launcher, scheduler defaults and environment tweaks, plus auto-detection
//! rules so the right profile can be picked without user input.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::env::EnvAction;
use crate::errors::ResolveError;
use crate::job::Job;
use crate::launch::Launcher;
use crate::topology::NodeTopology;

/// How to detect that we are running on a particular machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArchDetection {
    /// Detect by environment variable value.
    EnvVar {
        /// Environment variable name.
        name: String,
        /// Expected value.
        value: String,
    },
    /// Detect by hostname pattern (regex).
    HostnamePattern {
        /// Regex pattern to match the hostname.
        pattern: String,
    },
    /// Detect by existence of a file.
    FileExists {
        /// Path to check.
        path: String,
    },
}

impl ArchDetection {
    /// Check if this detection method matches the current environment.
    pub fn matches(&self) -> bool {
        match self {
            ArchDetection::EnvVar { name, value } => std::env::var(name)
                .map(|v| v == *value)
                .unwrap_or(false),
            ArchDetection::HostnamePattern { pattern } => {
                if let Ok(hostname) = hostname::get()
                    && let Some(hostname_str) = hostname.to_str()
                    && let Ok(re) = regex::Regex::new(pattern)
                {
                    return re.is_match(hostname_str);
                }
                false
            }
            ArchDetection::FileExists { path } => std::path::Path::new(path).exists(),
        }
    }
}

/// A machine profile: hardware topology plus system defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Arch {
    /// Profile name (used for registry lookup).
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// The node hardware topology of this machine.
    pub topology: NodeTopology,

    /// The launcher that is usually used on this system.
    pub launcher: Launcher,

    /// Default scheduler account, applied to jobs that do not set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Default scheduler partition, applied to jobs that do not set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,

    /// Resolve processed jobs against the profile topology, so that tasks,
    /// nodes and tasks per node are always set explicitly.
    #[serde(default)]
    pub resolve_jobs: bool,

    /// Environment operations that every launch on this machine needs.
    #[serde(default)]
    pub env_actions: Vec<EnvAction>,

    /// Extra flags that should be passed to the default launcher.
    #[serde(default)]
    pub launcher_flags: Vec<String>,

    /// Rules for auto-detecting this machine.
    #[serde(default)]
    pub detection: Vec<ArchDetection>,
}

/// Result of processing a job against a machine profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchJobResult {
    /// The updated job.
    pub job: Job,
    /// Environment operations required on this machine.
    pub env_actions: Vec<EnvAction>,
    /// The launcher to use.
    pub launcher: Launcher,
    /// Extra flags for the launcher invocation.
    pub launcher_flags: Vec<String>,
}

impl Arch {
    /// Check whether any of the profile's detection rules matches the
    /// current host.
    pub fn detected(&self) -> bool {
        self.detection.iter().any(ArchDetection::matches)
    }

    /// Apply the machine defaults to a job.
    ///
    /// Fills in `account` and `partition` when the job does not set them
    /// (an explicit job value always wins over the profile default) and,
    /// with `resolve_jobs`, resolves the job against the profile topology.
    /// The input job is not modified.
    pub fn process_job(&self, job: &Job) -> Result<ArchJobResult, ResolveError> {
        let mut job = job.clone();

        if job.account.is_none() {
            job.account = self.account.clone();
        }
        if job.partition.is_none() {
            job.partition = self.partition.clone();
        }

        if self.resolve_jobs {
            job = job.resolve(&self.topology)?;
        }

        Ok(ArchJobResult {
            job,
            env_actions: self.env_actions.clone(),
            launcher: self.launcher,
            launcher_flags: self.launcher_flags.clone(),
        })
    }
}

/// A collection of machine profiles with name lookup and auto-detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchRegistry {
    archs: Vec<Arch>,
}

impl ArchRegistry {
    pub fn new(archs: Vec<Arch>) -> Self {
        Self { archs }
    }

    /// Add a profile to the registry.
    pub fn register(&mut self, arch: Arch) {
        self.archs.push(arch);
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&Arch> {
        self.archs.iter().find(|arch| arch.name == name)
    }

    /// Return the first profile whose detection rules match the current
    /// host.
    pub fn detect(&self) -> Option<&Arch> {
        let arch = self.archs.iter().find(|arch| arch.detected());
        if let Some(arch) = arch {
            debug!("Detected machine profile {}", arch.name);
        }
        arch
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arch> {
        self.archs.iter()
    }
}
