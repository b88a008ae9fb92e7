//! Process execution utilities.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::{debug, error, info};

/// Outcome of a finished process.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    /// The process exit code (-1 if the process was terminated by a
    /// signal).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExecuteResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command and capture its output, regardless of the exit status.
///
/// The command is spawned without a shell. The provided environment
/// variables are overlaid on the current process environment; they do not
/// replace it. Returns an error only if the process could not be spawned.
pub fn try_execute(
    command: &[String],
    cwd: Option<&Path>,
    env: Option<&HashMap<String, String>>,
) -> Result<ExecuteResult> {
    let Some((program, args)) = command.split_first() else {
        bail!("cannot execute an empty command");
    };

    info!("Executing: {}", command.join(" "));
    if let Some(cwd) = cwd {
        debug!("Run directory: {}", cwd.display());
    }

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = env {
        cmd.envs(env);
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to spawn command: {}", program))?;

    Ok(ExecuteResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a command and fail on a non-zero exit status.
///
/// Same contract as [`try_execute`], but a non-zero exit code is turned
/// into an error carrying the captured stderr.
pub fn execute(
    command: &[String],
    cwd: Option<&Path>,
    env: Option<&HashMap<String, String>>,
) -> Result<ExecuteResult> {
    let result = try_execute(command, cwd, env)?;

    if !result.success() {
        error!("Execution failed with return code: {}", result.exit_code);
        bail!(
            "command `{}` failed with exit code {}: {}",
            command.join(" "),
            result.exit_code,
            result.stderr.trim()
        );
    }

    Ok(result)
}

/// Log a command and its environment without running anything.
pub fn log_dry_run(command: &[String], cwd: Option<&Path>, env: Option<&HashMap<String, String>>) {
    info!("Would execute: {}", command.join(" "));
    if let Some(cwd) = cwd {
        info!("Run directory: {}", cwd.display());
    }
    if let Some(env) = env {
        for (key, value) in env {
            debug!("\t{}={}", key, value);
        }
    }
}
