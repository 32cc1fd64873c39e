use crate::core::gate::ReadinessGate;
use crate::domain::model::CommandSpec;
use crate::domain::ports::{CommandRunner, ProcessHandoff, ReadinessProbe};
use crate::utils::error::{OpsError, Result};
use std::sync::Arc;

/// Container startup sequence: readiness gate, one migration run, handoff.
pub struct Entrypoint<P: ReadinessProbe> {
    gate: ReadinessGate<P>,
    runner: Arc<dyn CommandRunner>,
    handoff: Arc<dyn ProcessHandoff>,
    migrate: CommandSpec,
    skip_migrations: bool,
}

impl<P: ReadinessProbe> Entrypoint<P> {
    pub fn new(
        gate: ReadinessGate<P>,
        runner: Arc<dyn CommandRunner>,
        handoff: Arc<dyn ProcessHandoff>,
        migrate: CommandSpec,
    ) -> Self {
        Self {
            gate,
            runner,
            handoff,
            migrate,
            skip_migrations: false,
        }
    }

    pub fn skip_migrations(mut self, skip: bool) -> Self {
        self.skip_migrations = skip;
        self
    }

    /// Runs the sequence and returns the final command's exit code.
    ///
    /// With a real exec handoff this only returns on failure.
    pub async fn run(&self, command: CommandSpec) -> Result<i32> {
        if command.program.trim().is_empty() {
            return Err(OpsError::MissingConfigError {
                field: "command".to_string(),
            });
        }

        self.gate.wait().await?;

        if self.skip_migrations {
            tracing::info!("⏭️ Skipping migrations");
        } else {
            tracing::info!("🔄 Running migrations: {}", self.migrate);
            let outcome = self.runner.run(&self.migrate).await?;
            if !outcome.success() {
                tracing::error!("❌ Migrations failed with exit code {}", outcome.code);
                return Err(OpsError::MigrationFailed { code: outcome.code });
            }
            tracing::info!("✅ Migrations applied in {:?}", outcome.duration);
        }

        self.handoff.handoff(&command)
    }
}
