//! The concrete steps of the developer bootstrap checklist.
//!
//! Steps whose target can be observed on disk (virtualenv, migration
//! directory, working `.env`) skip themselves when it already exists, so the
//! whole checklist can be re-run after a failure.

use crate::config::toml_config::BootstrapConfig;
use crate::core::checklist::{BootstrapContext, BootstrapStep, Checklist};
use crate::domain::model::{CommandSpec, Criticality, StepStatus};
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Runs `command` in the project root; any non-zero exit fails `step`.
async fn run_checked(ctx: &BootstrapContext, step: &str, command: CommandSpec) -> Result<()> {
    let command = command.current_dir(ctx.root.clone());
    let outcome = ctx.runner.run(&command).await?;
    if outcome.success() {
        Ok(())
    } else {
        Err(OpsError::step_failed(
            step,
            format!("`{}` exited with code {}", command, outcome.code),
        ))
    }
}

fn venv_bin(venv_dir: &str) -> PathBuf {
    let bin = if cfg!(windows) { "Scripts" } else { "bin" };
    PathBuf::from(venv_dir).join(bin)
}

fn venv_tool(ctx: &BootstrapContext, bin: &std::path::Path, tool: &str) -> String {
    ctx.path(bin).join(tool).to_string_lossy().into_owned()
}

pub struct VirtualenvStep {
    interpreter: String,
    venv_dir: String,
}

impl VirtualenvStep {
    pub fn new(interpreter: impl Into<String>, venv_dir: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            venv_dir: venv_dir.into(),
        }
    }
}

#[async_trait]
impl BootstrapStep for VirtualenvStep {
    fn name(&self) -> &str {
        "virtualenv"
    }

    fn skip_reason(&self, ctx: &BootstrapContext) -> Option<String> {
        ctx.path(&self.venv_dir)
            .is_dir()
            .then(|| format!("{} already exists", self.venv_dir))
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        if !ctx.runner.is_available(&self.interpreter) {
            return Err(OpsError::step_failed(
                self.name(),
                format!("'{}' not found on PATH", self.interpreter),
            ));
        }

        let command = CommandSpec::new(self.interpreter.clone())
            .args(["-m", "venv", self.venv_dir.as_str()]);
        run_checked(ctx, self.name(), command).await?;
        Ok(StepStatus::Completed)
    }
}

pub struct DependenciesStep {
    venv_bin: PathBuf,
    requirements: String,
}

impl DependenciesStep {
    pub fn new(venv_dir: &str, requirements: impl Into<String>) -> Self {
        Self {
            venv_bin: venv_bin(venv_dir),
            requirements: requirements.into(),
        }
    }
}

#[async_trait]
impl BootstrapStep for DependenciesStep {
    fn name(&self) -> &str {
        "dependencies"
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        if !ctx.path(&self.requirements).is_file() {
            return Err(OpsError::step_failed(
                self.name(),
                format!("{} not found", self.requirements),
            ));
        }

        let command = CommandSpec::new(venv_tool(ctx, &self.venv_bin, "pip"))
            .args(["install", "-r", self.requirements.as_str()]);
        run_checked(ctx, self.name(), command).await?;
        Ok(StepStatus::Completed)
    }
}

pub struct DirectoriesStep {
    directories: Vec<String>,
}

impl DirectoriesStep {
    pub fn new(directories: Vec<String>) -> Self {
        Self { directories }
    }
}

#[async_trait]
impl BootstrapStep for DirectoriesStep {
    fn name(&self) -> &str {
        "directories"
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        for dir in &self.directories {
            let path = ctx.path(dir);
            std::fs::create_dir_all(&path)?;
            tracing::debug!("📁 {}", path.display());
        }
        Ok(StepStatus::Completed)
    }
}

pub struct MigrationsInitStep {
    venv_bin: PathBuf,
    tool: String,
    directory: String,
}

impl MigrationsInitStep {
    pub fn new(venv_dir: &str, tool: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            venv_bin: venv_bin(venv_dir),
            tool: tool.into(),
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl BootstrapStep for MigrationsInitStep {
    fn name(&self) -> &str {
        "migrations-init"
    }

    fn skip_reason(&self, ctx: &BootstrapContext) -> Option<String> {
        ctx.path(&self.directory)
            .exists()
            .then(|| format!("{} already initialized", self.directory))
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        let command = CommandSpec::new(venv_tool(ctx, &self.venv_bin, &self.tool))
            .args(["init", self.directory.as_str()]);
        run_checked(ctx, self.name(), command).await?;
        Ok(StepStatus::Completed)
    }
}

pub struct EnvFileStep {
    template: String,
    target: String,
}

impl EnvFileStep {
    pub fn new(template: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            target: target.into(),
        }
    }
}

#[async_trait]
impl BootstrapStep for EnvFileStep {
    fn name(&self) -> &str {
        "env-file"
    }

    fn skip_reason(&self, ctx: &BootstrapContext) -> Option<String> {
        ctx.path(&self.target)
            .exists()
            .then(|| format!("{} already exists", self.target))
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        let template = ctx.path(&self.template);
        if !template.is_file() {
            return Err(OpsError::TemplateMissing {
                path: template.display().to_string(),
            });
        }

        std::fs::copy(&template, ctx.path(&self.target))?;
        tracing::info!(
            "📝 Created {} from {}; review it before starting the app",
            self.target,
            self.template
        );
        Ok(StepStatus::Completed)
    }
}

/// Starts the cache container when a container runtime is installed.
pub struct CacheServiceStep {
    runtime: String,
    container_name: String,
    image: String,
    port: u16,
}

impl CacheServiceStep {
    pub fn new(
        runtime: impl Into<String>,
        container_name: impl Into<String>,
        image: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            container_name: container_name.into(),
            image: image.into(),
            port,
        }
    }
}

#[async_trait]
impl BootstrapStep for CacheServiceStep {
    fn name(&self) -> &str {
        "cache-service"
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        if !ctx.runner.is_available(&self.runtime) {
            return Ok(StepStatus::warned(format!(
                "{} not found; start the cache service manually",
                self.runtime
            )));
        }

        let run = CommandSpec::new(self.runtime.clone()).args([
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.container_name.clone(),
            "-p".to_string(),
            format!("{}:6379", self.port),
            self.image.clone(),
        ]);
        let started = ctx.runner.run(&run.current_dir(ctx.root.clone())).await?;
        if started.success() {
            return Ok(StepStatus::Completed);
        }

        // `run` fails when the container already exists from a previous bootstrap
        tracing::debug!("{} run exited with {}; trying start", self.runtime, started.code);
        let start = CommandSpec::new(self.runtime.clone())
            .args(["start", self.container_name.as_str()]);
        run_checked(ctx, self.name(), start).await?;
        Ok(StepStatus::Completed)
    }
}

/// Runs the test suite. Failures only warn: tests may need services that
/// are not up yet on a fresh machine.
pub struct TestsStep {
    venv_bin: PathBuf,
    command: Option<CommandSpec>,
}

impl TestsStep {
    pub fn new(venv_dir: &str, command: CommandSpec) -> Self {
        Self {
            venv_bin: venv_bin(venv_dir),
            command: Some(command),
        }
    }

    /// A blank line yields a step that only warns.
    pub fn from_line(venv_dir: &str, line: &str) -> Self {
        Self {
            venv_bin: venv_bin(venv_dir),
            command: CommandSpec::parse(line),
        }
    }
}

#[async_trait]
impl BootstrapStep for TestsStep {
    fn name(&self) -> &str {
        "tests"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Advisory
    }

    async fn run(&self, ctx: &BootstrapContext) -> Result<StepStatus> {
        let Some(configured) = &self.command else {
            return Ok(StepStatus::warned("tests.command is empty; no tests were run"));
        };
        let mut command = configured.clone();
        command.program = venv_tool(ctx, &self.venv_bin, &configured.program);
        run_checked(ctx, self.name(), command).await?;
        Ok(StepStatus::Completed)
    }
}

impl Checklist {
    /// The standard developer bootstrap sequence. Disabled cache or test
    /// sections drop their step.
    pub fn standard(config: &BootstrapConfig) -> Self {
        let venv_dir = config.python.venv_dir.as_str();

        let mut checklist = Checklist::new("bootstrap")
            .with_step(Box::new(VirtualenvStep::new(
                config.python.interpreter.clone(),
                venv_dir,
            )))
            .with_step(Box::new(DependenciesStep::new(
                venv_dir,
                config.python.requirements.clone(),
            )))
            .with_step(Box::new(DirectoriesStep::new(config.directories.clone())))
            .with_step(Box::new(MigrationsInitStep::new(
                venv_dir,
                config.migrations.tool.clone(),
                config.migrations.directory.clone(),
            )))
            .with_step(Box::new(EnvFileStep::new(
                config.environment.template.clone(),
                config.environment.target.clone(),
            )));

        if config.cache.enabled {
            checklist.add_step(Box::new(CacheServiceStep::new(
                config.cache.runtime.clone(),
                config.cache.container_name.clone(),
                config.cache.image.clone(),
                config.cache.port,
            )));
        }

        if config.tests.enabled {
            if config.tests.command.trim().is_empty() {
                tracing::warn!("⚠️ tests.enabled is set but tests.command is empty");
            }
            checklist.add_step(Box::new(TestsStep::from_line(venv_dir, &config.tests.command)));
        }

        checklist
    }
}
