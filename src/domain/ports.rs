use crate::domain::model::{CommandSpec, ExitOutcome, ProbeOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Runs external commands to completion and reports their exit status.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<ExitOutcome>;

    /// Whether `program` can be found (on `PATH` or as a direct path).
    fn is_available(&self, program: &str) -> bool;
}

/// Checks whether a dependent service accepts connections right now.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;

    fn target(&self) -> String;
}

/// Transfers control to the final command.
///
/// A real handoff replaces the current process and only returns on failure;
/// implementations that cannot exec return the command's exit code instead.
pub trait ProcessHandoff: Send + Sync {
    fn handoff(&self, command: &CommandSpec) -> Result<i32>;
}
