//! Launch command assembly for the supported MPI launchers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::env::{EnvAction, EnvPipeline};
use crate::exec::{self, ExecuteResult};
use crate::job::{CpuDistribution, Job};
use crate::launch::vocabulary::{
    self, DistributionStyle, LauncherVocabulary, render_template,
};

/// The supported launcher flavors.
///
/// All flavors render a job through the same algorithm and differ only in
/// their flag vocabulary. The serialized form carries a `launcher_type`
/// discriminator, so the variant is fixed at the deserialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "launcher_type", rename_all = "snake_case")]
pub enum Launcher {
    /// Slurm's srun.
    Srun,
    /// A standard Open MPI style mpirun.
    Mpirun,
    /// Cray's aprun.
    Aprun,
}

impl std::fmt::Display for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.executable())
    }
}

impl std::str::FromStr for Launcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srun" => Ok(Launcher::Srun),
            "mpirun" => Ok(Launcher::Mpirun),
            "aprun" => Ok(Launcher::Aprun),
            _ => Err(format!("Unknown launcher: {}", s)),
        }
    }
}

impl Launcher {
    /// The launcher executable name.
    pub fn executable(&self) -> &'static str {
        self.vocabulary().executable
    }

    fn vocabulary(&self) -> &'static LauncherVocabulary {
        match self {
            Launcher::Srun => &vocabulary::SRUN,
            Launcher::Mpirun => &vocabulary::MPIRUN,
            Launcher::Aprun => &vocabulary::APRUN,
        }
    }

    /// Assemble the launch command, working directory and environment for
    /// the given job.
    ///
    /// Flags are rendered for every attribute the job has set, in the fixed
    /// vocabulary order, followed by binding flags, distribution flags and
    /// the caller's custom flags (passed through verbatim), then the
    /// command itself. `library_paths` are appended to `LD_LIBRARY_PATH`
    /// through the environment pipeline before it is executed.
    ///
    /// The job is expected to have been resolved already; no consistency
    /// checking happens here, unset attributes simply produce no flags.
    pub fn prepare(
        &self,
        run_dir: &Path,
        job: &Job,
        cmd: &[String],
        library_paths: &[PathBuf],
        env_pipeline: Option<EnvPipeline>,
        custom_flags: &[String],
    ) -> LaunchData {
        let vocabulary = self.vocabulary();
        let mut env_pipeline = env_pipeline.unwrap_or_default();

        let mut tokens = vec![vocabulary.executable.to_string()];

        for (option, template) in vocabulary.job_options {
            if let Some(value) = option.value(job) {
                tokens.extend(render_template(template, &value));
            }
        }

        if let Some(bind) = job.bind {
            tokens.extend(
                vocabulary
                    .bind_flags(bind)
                    .iter()
                    .map(|flag| flag.to_string()),
            );
        }

        tokens.extend(self.distribution_flags(job));

        tokens.extend(custom_flags.iter().cloned());

        for path in library_paths {
            env_pipeline.push(EnvAction::Append {
                key: "LD_LIBRARY_PATH".to_string(),
                value: path.display().to_string(),
            });
        }

        tokens.extend(cmd.iter().cloned());

        let env = env_pipeline.execute();

        LaunchData {
            run_dir: run_dir.to_path_buf(),
            cmd: tokens,
            env,
        }
    }

    /// Render the task placement flags this launcher can express.
    fn distribution_flags(&self, job: &Job) -> Vec<String> {
        match self.vocabulary().distribution {
            DistributionStyle::Combined => Self::combined_distribution_flags(job),
            DistributionStyle::LocalOnly => self.local_distribution_flags(job),
            DistributionStyle::Unsupported => Vec::new(),
        }
    }

    /// The combined `--distribution=<remote>:<local>` flag, where an unset
    /// or default axis renders as `*`.
    ///
    /// A `User` strategy on either axis suppresses the flag for both axes;
    /// the user's custom flags are expected to carry the full placement
    /// specification in that case.
    fn combined_distribution_flags(job: &Job) -> Vec<String> {
        if job.distribute_remote.is_none() && job.distribute_local.is_none() {
            return Vec::new();
        }

        if job.distribute_remote == Some(CpuDistribution::User) {
            debug!(
                "Not applying task distribution options because remote distribution \
                 of tasks is set to use user-provided settings"
            );
            return Vec::new();
        }
        if job.distribute_local == Some(CpuDistribution::User) {
            debug!(
                "Not applying task distribution options because local distribution \
                 of tasks is set to use user-provided settings"
            );
            return Vec::new();
        }

        let axis = |distribution: Option<CpuDistribution>| match distribution {
            None | Some(CpuDistribution::Default) => "*",
            Some(CpuDistribution::Block) => "block",
            Some(CpuDistribution::Cyclic) => "cyclic",
            // User is handled above.
            Some(CpuDistribution::User) => "*",
        };

        vec![format!(
            "--distribution={}:{}",
            axis(job.distribute_remote),
            axis(job.distribute_local)
        )]
    }

    /// Within-node placement via `--map-by`. Remote placement cannot be
    /// expressed; a non-default request is dropped with a warning.
    fn local_distribution_flags(&self, job: &Job) -> Vec<String> {
        let inexpressible = |distribution: Option<CpuDistribution>| {
            !matches!(
                distribution,
                None | Some(CpuDistribution::Default) | Some(CpuDistribution::User)
            )
        };

        if inexpressible(job.distribute_remote) {
            warn!(
                "Specified remote distribution option ignored by the {} launcher",
                self.executable()
            );
        }

        match job.distribute_local {
            Some(CpuDistribution::Block) => {
                vec!["--map-by".to_string(), "core".to_string()]
            }
            Some(CpuDistribution::Cyclic) => {
                vec!["--map-by".to_string(), "numa".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

/// Everything needed to launch a prepared command: the working directory,
/// the full argv vector and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchData {
    /// The working directory for launching.
    pub run_dir: PathBuf,
    /// The command that gets launched, launcher executable first.
    pub cmd: Vec<String>,
    /// The environment variables for the launch.
    pub env: HashMap<String, String>,
}

impl LaunchData {
    /// Spawn the prepared command and wait for it to finish.
    pub fn launch(&self) -> Result<ExecuteResult> {
        info!(
            "Launch command {:?} in {}",
            self.cmd,
            self.run_dir.display()
        );

        debug!("Environment variables:");
        for (key, value) in &self.env {
            debug!("\t{}={}", key, value);
        }

        exec::execute(&self.cmd, Some(&self.run_dir), Some(&self.env))
    }

    /// Log the prepared command without spawning anything.
    pub fn dry_run(&self) {
        exec::log_dry_run(&self.cmd, Some(&self.run_dir), Some(&self.env));
    }
}
