//! Tests for configuration deserialization: flat key/value construction of
//! jobs and topologies, launcher discrimination and the launch
//! configuration envelope.

use std::collections::HashMap;
use std::path::Path;

use rstest::rstest;

use nwpbench::arch::Arch;
use nwpbench::config::LaunchConfig;
use nwpbench::job::{CpuBinding, CpuDistribution, Job};
use nwpbench::launch::Launcher;
use nwpbench::topology::NodeTopology;

#[test]
fn test_job_from_flat_map() {
    let job: Job = serde_json::from_str(
        r#"{
            "tasks": 64,
            "cpus_per_task": 4,
            "bind": "threads",
            "distribute_remote": "block",
            "distribute_local": "cyclic",
            "account": "rd"
        }"#,
    )
    .unwrap();

    assert_eq!(job.tasks, Some(64));
    assert_eq!(job.cpus_per_task, Some(4));
    assert_eq!(job.bind, Some(CpuBinding::Threads));
    assert_eq!(job.distribute_remote, Some(CpuDistribution::Block));
    assert_eq!(job.distribute_local, Some(CpuDistribution::Cyclic));
    assert_eq!(job.account.as_deref(), Some("rd"));
    assert_eq!(job.nodes, None);
}

#[test]
fn test_job_dump_round_trip_preserves_partial_specification() {
    let job = Job {
        tasks: Some(64),
        gpus_per_task: Some(1),
        ..Default::default()
    };

    let dumped = serde_json::to_string(&job).unwrap();
    let reparsed: Job = serde_json::from_str(&dumped).unwrap();
    assert_eq!(reparsed, job);
}

#[rstest]
#[case(r#"{"launcher_type": "srun"}"#, Launcher::Srun)]
#[case(r#"{"launcher_type": "mpirun"}"#, Launcher::Mpirun)]
#[case(r#"{"launcher_type": "aprun"}"#, Launcher::Aprun)]
fn test_launcher_discriminator(#[case] data: &str, #[case] expected: Launcher) {
    let launcher: Launcher = serde_json::from_str(data).unwrap();
    assert_eq!(launcher, expected);

    let dumped = serde_json::to_string(&launcher).unwrap();
    let reparsed: Launcher = serde_json::from_str(&dumped).unwrap();
    assert_eq!(reparsed, expected);
}

#[test]
fn test_unknown_launcher_rejected() {
    let result: Result<Launcher, _> = serde_json::from_str(r#"{"launcher_type": "qsub"}"#);
    assert!(result.is_err());
}

#[test]
fn test_topology_validation_applies_to_config() {
    let result: Result<NodeTopology, _> = serde_json::from_str(
        r#"{"sockets_per_node": 2, "cores_per_socket": 0, "threads_per_core": 2}"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_launch_config_file_round_trip() {
    let config = LaunchConfig::from_json_str(
        r#"{
            "topology": {
                "sockets_per_node": 2,
                "cores_per_socket": 8,
                "threads_per_core": 2,
                "gpus_per_node": 4
            },
            "job": {"tasks": 64, "gpus_per_task": 1},
            "launcher": {"launcher_type": "srun"},
            "env": [
                {"mode": "set", "key": "OMP_NUM_THREADS", "value": "1"},
                {"mode": "append", "key": "LD_LIBRARY_PATH", "value": "/opt/grib/lib"}
            ],
            "custom_flags": ["--qos=np"]
        }"#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("launch.json");
    config.save(&path).unwrap();

    let reloaded = LaunchConfig::load(&path).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_launch_config_gpu_flow() {
    let config = LaunchConfig::from_json_str(
        r#"{
            "topology": {
                "sockets_per_node": 2,
                "cores_per_socket": 8,
                "threads_per_core": 2,
                "gpus_per_node": 4
            },
            "job": {"tasks": 64, "gpus_per_task": 1},
            "launcher": {"launcher_type": "srun"}
        }"#,
    )
    .unwrap();

    let data = config
        .prepare_launch(
            Path::new("/tmp/run"),
            &["model.exe".to_string()],
            HashMap::new(),
        )
        .unwrap();

    // tasks_per_node is clamped to the GPU budget during resolution.
    assert!(data.cmd.contains(&"--ntasks=64".to_string()));
    assert!(data.cmd.contains(&"--nodes=16".to_string()));
    assert!(data.cmd.contains(&"--ntasks-per-node=4".to_string()));
    assert!(data.cmd.contains(&"--gpus-per-node=4".to_string()));
}

#[test]
fn test_launch_config_unsatisfiable_job_fails() {
    let config = LaunchConfig::from_json_str(
        r#"{
            "topology": {
                "sockets_per_node": 2,
                "cores_per_socket": 8,
                "threads_per_core": 2,
                "gpus_per_node": 4
            },
            "job": {"tasks": 64, "tasks_per_node": 4, "gpus_per_task": 2},
            "launcher": {"launcher_type": "srun"}
        }"#,
    )
    .unwrap();

    let result = config.prepare_launch(
        Path::new("/tmp/run"),
        &["model.exe".to_string()],
        HashMap::new(),
    );
    assert!(result.is_err());
}

#[test]
fn test_arch_profile_from_config() {
    let arch: Arch = serde_json::from_str(
        r#"{
            "name": "cray-eb",
            "description": "Cray XC40 benchmark partition",
            "topology": {
                "sockets_per_node": 2,
                "cores_per_socket": 18,
                "threads_per_core": 2
            },
            "launcher": {"launcher_type": "aprun"},
            "partition": "compute",
            "resolve_jobs": true,
            "env_actions": [
                {"mode": "set", "key": "OMP_PLACES", "value": "cores"}
            ],
            "detection": [
                {"type": "env_var", "name": "SITE_PLATFORM_NAME", "value": "cray-eb"},
                {"type": "hostname_pattern", "pattern": "^login[0-9]+"}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(arch.launcher, Launcher::Aprun);
    assert_eq!(arch.detection.len(), 2);

    let result = arch
        .process_job(&Job {
            tasks: Some(72),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(result.job.partition.as_deref(), Some("compute"));
    assert_eq!(result.job.nodes, Some(2));
    assert_eq!(result.job.tasks_per_node, Some(36));
}
