//! Child-process plumbing: running commands to completion, locating
//! executables on `PATH`, and the final exec handoff.

use crate::domain::model::{CommandSpec, ExitOutcome};
use crate::domain::ports::{CommandRunner, ProcessHandoff};
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::process::Command;

/// Runs commands with the parent's stdio inherited, so tool output streams
/// straight to the operator's terminal.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    quiet: bool,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the child's stdout/stderr; used for probes that poll every second.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ExitOutcome> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null()).kill_on_drop(true);

        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("▶️ Running: {}", command);
        let start = Instant::now();

        let status = cmd
            .status()
            .await
            .map_err(|source| OpsError::CommandSpawnError {
                program: command.program.clone(),
                source,
            })?;

        Ok(ExitOutcome {
            code: status_code(status),
            duration: start.elapsed(),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        find_executable(program).is_some()
    }
}

/// Exit code as a shell reports it: a child killed by signal `n` yields `128 + n`.
#[cfg(unix)]
pub fn status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
pub fn status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Resolves `program` the way a shell would: direct paths are checked as-is,
/// bare names are searched for in each `PATH` entry.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    ["", ".exe", ".cmd", ".bat"]
        .iter()
        .map(|ext| dir.join(format!("{}{}", program, ext)))
        .collect()
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Replaces the current process with the target command.
#[derive(Debug, Clone, Default)]
pub struct ExecHandoff;

impl ProcessHandoff for ExecHandoff {
    #[cfg(unix)]
    fn handoff(&self, command: &CommandSpec) -> Result<i32> {
        use std::os::unix::process::CommandExt;

        let mut cmd = std::process::Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!("🚀 Handing off to: {}", command);
        // exec only returns if the image could not be replaced
        let source = cmd.exec();
        Err(OpsError::HandoffFailed {
            program: command.program.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn handoff(&self, command: &CommandSpec) -> Result<i32> {
        let mut cmd = std::process::Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!("🚀 Running final command: {}", command);
        let status = cmd.status().map_err(|source| OpsError::HandoffFailed {
            program: command.program.clone(),
            source,
        })?;
        Ok(status_code(status))
    }
}
