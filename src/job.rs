//! Parallel job description and resource resolution.
//!
//! A [`Job`] is a partially specified request for parallel resources (MPI
//! tasks, nodes, task placement, CPU/GPU counts per task). Missing
//! dimensions are derived from a [`NodeTopology`] via [`Job::resolve`],
//! which either returns a fully determined copy or fails on a
//! contradictory specification.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::ResolveError;
use crate::topology::NodeTopology;

/// CPU binding strategy for which the launch command should provide the
/// appropriate pinning options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuBinding {
    /// Disable all binding specification.
    None,
    /// Bind tasks to sockets.
    Sockets,
    /// Bind tasks to cores.
    Cores,
    /// Bind tasks to hardware threads.
    Threads,
    /// A user-specified strategy is passed via custom flags instead.
    User,
}

impl std::fmt::Display for CpuBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuBinding::None => write!(f, "none"),
            CpuBinding::Sockets => write!(f, "sockets"),
            CpuBinding::Cores => write!(f, "cores"),
            CpuBinding::Threads => write!(f, "threads"),
            CpuBinding::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for CpuBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CpuBinding::None),
            "sockets" => Ok(CpuBinding::Sockets),
            "cores" => Ok(CpuBinding::Cores),
            "threads" => Ok(CpuBinding::Threads),
            "user" => Ok(CpuBinding::User),
            _ => Err(format!("Invalid binding strategy: {}", s)),
        }
    }
}

/// Task distribution strategy for which the launch command should provide
/// the appropriate placement options.
///
/// The same enum describes placement across nodes (`distribute_remote`) and
/// across sockets within a node (`distribute_local`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuDistribution {
    /// Use the launcher's default strategy.
    Default,
    /// Place tasks consecutively.
    Block,
    /// Place tasks in a round-robin fashion.
    Cyclic,
    /// A user-specified strategy is passed via custom flags instead.
    User,
}

impl std::fmt::Display for CpuDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuDistribution::Default => write!(f, "default"),
            CpuDistribution::Block => write!(f, "block"),
            CpuDistribution::Cyclic => write!(f, "cyclic"),
            CpuDistribution::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for CpuDistribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(CpuDistribution::Default),
            "block" => Ok(CpuDistribution::Block),
            "cyclic" => Ok(CpuDistribution::Cyclic),
            "user" => Ok(CpuDistribution::User),
            _ => Err(format!("Invalid distribution strategy: {}", s)),
        }
    }
}

/// Description of a parallel job setup.
///
/// All fields are optional; a job is typically created with a partial
/// specification and completed against a hardware topology with
/// [`Job::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Job {
    /// The number of tasks/processes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<u32>,

    /// The number of nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,

    /// The number of tasks per node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_per_node: Option<u32>,

    /// The number of tasks per socket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_per_socket: Option<u32>,

    /// The number of CPUs assigned to each task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus_per_task: Option<u32>,

    /// The number of threads that each CPU core should run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_per_core: Option<u32>,

    /// The number of GPUs required by each task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus_per_task: Option<u32>,

    /// The number of GPUs requested on each node. Derived from
    /// `gpus_per_task` during resolution when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus_per_node: Option<u32>,

    /// The account that is passed to the scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// The partition that is passed to the scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,

    /// The binding strategy to use for task pinning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<CpuBinding>,

    /// The distribution strategy for task placement across nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribute_remote: Option<CpuDistribution>,

    /// The distribution strategy for task placement across sockets within a
    /// node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribute_local: Option<CpuDistribution>,
}

impl Job {
    /// Derive all missing resource dimensions from the given topology.
    ///
    /// Returns a new, fully determined job; `self` is never modified. At
    /// least one of
    ///
    /// * the total number of tasks (`tasks`),
    /// * `nodes` together with `tasks_per_node`,
    /// * `nodes` together with `tasks_per_socket`
    ///
    /// must be specified. On success, `tasks`, `nodes` and `tasks_per_node`
    /// are all set and satisfy `tasks <= nodes * tasks_per_node`.
    ///
    /// Quantities that only enter the arithmetic (`cpus_per_task`,
    /// `threads_per_core`, `gpus_per_task`) default to 1, 1 and 0
    /// respectively but remain unset on the returned job if they were unset
    /// here.
    ///
    /// Fails with [`ResolveError::MissingDimension`] if the specification is
    /// insufficient and with [`ResolveError::UnsatisfiableResource`] if
    /// explicitly requested values contradict the hardware limits. An
    /// automatically derived `tasks_per_node` is clamped to the node GPU
    /// budget, but an explicitly supplied one is validated and never
    /// silently adjusted.
    ///
    /// Resolving an already fully specified, self-consistent job is a
    /// no-op.
    pub fn resolve(&self, topology: &NodeTopology) -> Result<Job, ResolveError> {
        let mut job = self.clone();

        let cpus_per_task = self.cpus_per_task.unwrap_or(1);
        let threads_per_core = self.threads_per_core.unwrap_or(1);
        let gpus_per_task = self.gpus_per_task.unwrap_or(0);

        let tasks_per_node = match job.tasks_per_node {
            Some(tasks_per_node) => {
                // An explicit value that exceeds the node GPU budget is an
                // error, not something to clamp behind the user's back.
                if gpus_per_task > 0 && tasks_per_node * gpus_per_task > topology.gpus_per_node() {
                    return Err(ResolveError::UnsatisfiableResource(format!(
                        "{} tasks per node with {} GPUs per task exceed the {} GPUs \
                         available per node",
                        tasks_per_node,
                        gpus_per_task,
                        topology.gpus_per_node()
                    )));
                }
                tasks_per_node
            }
            None => {
                let mut tasks_per_node = if let Some(tasks_per_socket) = job.tasks_per_socket {
                    tasks_per_socket * topology.sockets_per_node()
                } else if job.tasks.is_some() {
                    // Pack as many tasks per node as physical cores allow,
                    // ignoring SMT at this stage.
                    topology.cores_per_node() / cpus_per_task
                } else {
                    return Err(ResolveError::MissingDimension(
                        "the number of tasks per node could not be determined".to_string(),
                    ));
                };

                if gpus_per_task > 0 {
                    tasks_per_node = tasks_per_node.min(topology.gpus_per_node() / gpus_per_task);
                }

                if tasks_per_node == 0 {
                    return Err(ResolveError::UnsatisfiableResource(format!(
                        "no task fits on a node with {} cores and {} GPUs \
                         ({} CPUs and {} GPUs requested per task)",
                        topology.cores_per_node(),
                        topology.gpus_per_node(),
                        cpus_per_task,
                        gpus_per_task
                    )));
                }

                debug!("Derived tasks_per_node={}", tasks_per_node);
                tasks_per_node
            }
        };
        job.tasks_per_node = Some(tasks_per_node);

        let nodes = match job.nodes {
            Some(nodes) => nodes,
            None => {
                let Some(tasks) = job.tasks else {
                    return Err(ResolveError::MissingDimension(
                        "the number of nodes could not be determined".to_string(),
                    ));
                };

                let threads_per_node = tasks_per_node * threads_per_core * cpus_per_task;
                let nodes = (tasks * cpus_per_task).div_ceil(threads_per_node);
                debug!("Derived nodes={}", nodes);
                nodes
            }
        };
        job.nodes = Some(nodes);

        // Undersubscription is legal: an explicit task count below the
        // node capacity stays as given.
        let tasks = match job.tasks {
            Some(tasks) => tasks,
            None => {
                let tasks = nodes * tasks_per_node;
                debug!("Derived tasks={}", tasks);
                tasks
            }
        };
        job.tasks = Some(tasks);

        if job.gpus_per_node.is_none() && gpus_per_task > 0 {
            job.gpus_per_node = Some(tasks_per_node * gpus_per_task);
        }

        if let Some(gpus_per_node) = job.gpus_per_node
            && gpus_per_node > topology.gpus_per_node()
        {
            return Err(ResolveError::UnsatisfiableResource(format!(
                "{} GPUs requested per node but only {} are available",
                gpus_per_node,
                topology.gpus_per_node()
            )));
        }

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_round_trip() {
        for bind in [
            CpuBinding::None,
            CpuBinding::Sockets,
            CpuBinding::Cores,
            CpuBinding::Threads,
            CpuBinding::User,
        ] {
            let parsed: CpuBinding = bind.to_string().parse().unwrap();
            assert_eq!(parsed, bind);
        }
        assert!("hwthread".parse::<CpuBinding>().is_err());
    }

    #[test]
    fn test_distribution_round_trip() {
        for distribution in [
            CpuDistribution::Default,
            CpuDistribution::Block,
            CpuDistribution::Cyclic,
            CpuDistribution::User,
        ] {
            let parsed: CpuDistribution = distribution.to_string().parse().unwrap();
            assert_eq!(parsed, distribution);
        }
        assert!("scatter".parse::<CpuDistribution>().is_err());
    }

    #[test]
    fn test_job_serialization_is_flat_and_sparse() {
        let job = Job {
            tasks: Some(64),
            cpus_per_task: Some(4),
            bind: Some(CpuBinding::Cores),
            ..Default::default()
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tasks": 64, "cpus_per_task": 4, "bind": "cores"})
        );
    }

    #[test]
    fn test_job_rejects_unknown_keys() {
        let result: Result<Job, _> = serde_json::from_str(r#"{"tasks": 64, "ranks": 4}"#);
        assert!(result.is_err());
    }
}
