//! Per-launcher flag vocabularies.
//!
//! All launch encoders share one algorithm and differ only in their flag
//! vocabulary: the executable name, the (attribute, template) table, the
//! binding table and the distribution syntax they can express. The tables
//! here must match the respective launcher's flag syntax exactly.

use crate::job::{CpuBinding, Job};

/// Job attributes that can be rendered into launcher flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOption {
    Tasks,
    Nodes,
    TasksPerNode,
    TasksPerSocket,
    CpusPerTask,
    ThreadsPerCore,
    GpusPerNode,
    Account,
    Partition,
}

impl JobOption {
    /// Read the corresponding attribute off a job, rendered to a string.
    /// Unset attributes yield `None` and produce no flag.
    pub(crate) fn value(&self, job: &Job) -> Option<String> {
        match self {
            JobOption::Tasks => job.tasks.map(|v| v.to_string()),
            JobOption::Nodes => job.nodes.map(|v| v.to_string()),
            JobOption::TasksPerNode => job.tasks_per_node.map(|v| v.to_string()),
            JobOption::TasksPerSocket => job.tasks_per_socket.map(|v| v.to_string()),
            JobOption::CpusPerTask => job.cpus_per_task.map(|v| v.to_string()),
            JobOption::ThreadsPerCore => job.threads_per_core.map(|v| v.to_string()),
            JobOption::GpusPerNode => job.gpus_per_node.map(|v| v.to_string()),
            JobOption::Account => job.account.clone(),
            JobOption::Partition => job.partition.clone(),
        }
    }
}

/// The distribution flag syntax a launcher can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DistributionStyle {
    /// One combined remote:local flag (srun `--distribution=block:cyclic`).
    Combined,
    /// Only within-node placement is expressible (mpirun `--map-by`);
    /// remote placement requests are dropped with a warning.
    LocalOnly,
    /// No distribution flags at all; requests are ignored outright.
    Unsupported,
}

/// The complete flag vocabulary of one launcher flavor.
pub(crate) struct LauncherVocabulary {
    /// The launcher executable.
    pub executable: &'static str,

    /// Ordered (attribute, template) table. Templates contain a single `{}`
    /// placeholder; rendered flags are split on whitespace into argv
    /// tokens.
    pub job_options: &'static [(JobOption, &'static str)],

    /// Binding strategy to flag tokens. `User` maps to no tokens for every
    /// launcher: user-provided binding travels via custom flags.
    pub bind_options: &'static [(CpuBinding, &'static [&'static str])],

    /// How task distribution requests are rendered.
    pub distribution: DistributionStyle,
}

impl LauncherVocabulary {
    /// Look up the binding flags for a strategy.
    pub(crate) fn bind_flags(&self, bind: CpuBinding) -> &'static [&'static str] {
        self.bind_options
            .iter()
            .find(|(candidate, _)| *candidate == bind)
            .map(|(_, flags)| *flags)
            .unwrap_or(&[])
    }
}

/// Substitute a value into a flag template and split the result into argv
/// tokens. Two-part templates like `-n {}` become two tokens.
pub(crate) fn render_template(template: &str, value: &str) -> Vec<String> {
    template
        .replace("{}", value)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub(crate) static SRUN: LauncherVocabulary = LauncherVocabulary {
    executable: "srun",
    job_options: &[
        (JobOption::Nodes, "--nodes={}"),
        (JobOption::Tasks, "--ntasks={}"),
        (JobOption::TasksPerNode, "--ntasks-per-node={}"),
        (JobOption::TasksPerSocket, "--ntasks-per-socket={}"),
        (JobOption::CpusPerTask, "--cpus-per-task={}"),
        (JobOption::ThreadsPerCore, "--ntasks-per-core={}"),
        (JobOption::GpusPerNode, "--gpus-per-node={}"),
        (JobOption::Account, "--account={}"),
        (JobOption::Partition, "--partition={}"),
    ],
    bind_options: &[
        (CpuBinding::None, &["--cpu-bind=none"]),
        (CpuBinding::Sockets, &["--cpu-bind=sockets"]),
        (CpuBinding::Cores, &["--cpu-bind=cores"]),
        (CpuBinding::Threads, &["--cpu-bind=threads"]),
        (CpuBinding::User, &[]),
    ],
    distribution: DistributionStyle::Combined,
};

pub(crate) static MPIRUN: LauncherVocabulary = LauncherVocabulary {
    executable: "mpirun",
    job_options: &[
        (JobOption::Tasks, "-n {}"),
        (JobOption::TasksPerNode, "--npernode {}"),
        (JobOption::TasksPerSocket, "--npersocket {}"),
        (JobOption::CpusPerTask, "--cpus-per-proc {}"),
    ],
    bind_options: &[
        (CpuBinding::None, &["--bind-to", "none"]),
        (CpuBinding::Sockets, &["--bind-to", "socket"]),
        (CpuBinding::Cores, &["--bind-to", "core"]),
        (CpuBinding::Threads, &["--bind-to", "hwthread"]),
        (CpuBinding::User, &[]),
    ],
    distribution: DistributionStyle::LocalOnly,
};

pub(crate) static APRUN: LauncherVocabulary = LauncherVocabulary {
    executable: "aprun",
    job_options: &[
        (JobOption::Tasks, "-n {}"),
        (JobOption::TasksPerNode, "-N {}"),
        (JobOption::TasksPerSocket, "-S {}"),
        (JobOption::CpusPerTask, "-d {}"),
        (JobOption::ThreadsPerCore, "-j {}"),
    ],
    bind_options: &[
        (CpuBinding::None, &["-cc", "none"]),
        (CpuBinding::Sockets, &["-cc", "numa_node"]),
        (CpuBinding::Cores, &["-cc", "cpu"]),
        (CpuBinding::Threads, &["-cc", "depth"]),
        (CpuBinding::User, &[]),
    ],
    distribution: DistributionStyle::Unsupported,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_token_template() {
        assert_eq!(render_template("--ntasks={}", "64"), vec!["--ntasks=64"]);
    }

    #[test]
    fn test_render_two_token_template() {
        assert_eq!(render_template("-n {}", "64"), vec!["-n", "64"]);
    }

    #[test]
    fn test_user_binding_renders_nothing() {
        for vocabulary in [&SRUN, &MPIRUN, &APRUN] {
            assert!(vocabulary.bind_flags(CpuBinding::User).is_empty());
        }
    }

    #[test]
    fn test_job_option_reads_unset_as_none() {
        let job = Job::default();
        assert_eq!(JobOption::Tasks.value(&job), None);
        assert_eq!(JobOption::Account.value(&job), None);
    }
}
