use crate::domain::model::{ChecklistReport, Criticality, StepReport, StepStatus};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{OpsError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What every step sees: the project root and the command runner.
#[derive(Clone)]
pub struct BootstrapContext {
    pub root: PathBuf,
    pub runner: Arc<dyn CommandRunner>,
}

impl BootstrapContext {
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// One entry of the bootstrap checklist.
#[async_trait::async_trait]
pub trait BootstrapStep: Send + Sync {
    fn name(&self) -> &str;

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    /// `Some(reason)` when the step's target already exists.
    fn skip_reason(&self, _ctx: &BootstrapContext) -> Option<String> {
        None
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus>;
}

/// Ordered checklist; the first fatal failure aborts the run.
pub struct Checklist {
    steps: Vec<Box<dyn BootstrapStep>>,
    execution_id: String,
}

impl Checklist {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            execution_id: execution_id.into(),
        }
    }

    pub fn add_step(&mut self, step: Box<dyn BootstrapStep>) {
        self.steps.push(step);
    }

    pub fn with_step(mut self, step: Box<dyn BootstrapStep>) -> Self {
        self.add_step(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn execute_all(&self, ctx: &BootstrapContext) -> Result<ChecklistReport> {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(self.steps.len());

        tracing::info!(
            "📋 Running checklist '{}' ({} steps) in {}",
            self.execution_id,
            self.steps.len(),
            ctx.root.display()
        );

        for (index, step) in self.steps.iter().enumerate() {
            let start_time = Instant::now();
            tracing::info!("[{}/{}] {}", index + 1, self.steps.len(), step.name());

            let status = if let Some(reason) = step.skip_reason(ctx) {
                tracing::info!("⏭️ Skipping {}: {}", step.name(), reason);
                StepStatus::skipped(reason)
            } else {
                match step.run(ctx).await {
                    Ok(status) => status,
                    Err(e) => match step.criticality() {
                        Criticality::Fatal => {
                            tracing::error!("❌ Step '{}' failed: {}", step.name(), e);
                            return Err(match e {
                                OpsError::StepFailed { .. } => e,
                                other => OpsError::step_failed(step.name(), other.to_string()),
                            });
                        }
                        Criticality::Advisory => StepStatus::warned(e.to_string()),
                    },
                }
            };

            match &status {
                StepStatus::Completed => tracing::info!("✅ {} done", step.name()),
                StepStatus::Warned { reason } => {
                    tracing::warn!("⚠️ {}: {}", step.name(), reason)
                }
                StepStatus::Skipped { .. } => {}
            }

            reports.push(StepReport {
                step: step.name().to_string(),
                status,
                duration: start_time.elapsed(),
            });
        }

        Ok(ChecklistReport {
            execution_id: self.execution_id.clone(),
            started_at,
            finished_at: Utc::now(),
            steps: reports,
        })
    }
}
