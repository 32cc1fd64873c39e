use crate::config::settings::env_lookup;
use crate::config::toml_config::BootstrapConfig;
use crate::domain::model::{FindingLevel, ProbeOutcome, VerificationReport};
use crate::domain::ports::ReadinessProbe;
use std::path::PathBuf;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Installation check: directory layout, environment, database, cache,
/// background workers and the API health endpoint.
///
/// Missing directories are created and reported as warnings. Missing
/// essential variables and an unreachable database are errors; optional
/// variables, the cache, workers and the API only warn. The worker and API
/// checks run only when their probes are attached.
pub struct Verifier {
    root: PathBuf,
    config: BootstrapConfig,
    database: Box<dyn ReadinessProbe>,
    cache: Box<dyn ReadinessProbe>,
    workers: Option<Box<dyn ReadinessProbe>>,
    api: Option<Box<dyn ReadinessProbe>>,
    lookup: EnvLookup,
}

impl Verifier {
    pub fn new(
        root: impl Into<PathBuf>,
        config: BootstrapConfig,
        database: Box<dyn ReadinessProbe>,
        cache: Box<dyn ReadinessProbe>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            database,
            cache,
            workers: None,
            api: None,
            lookup: Box::new(env_lookup),
        }
    }

    pub fn with_worker_probe(mut self, probe: Box<dyn ReadinessProbe>) -> Self {
        self.workers = Some(probe);
        self
    }

    pub fn with_health_probe(mut self, probe: Box<dyn ReadinessProbe>) -> Self {
        self.api = Some(probe);
        self
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Box::new(lookup);
        self
    }

    pub async fn run(&self) -> VerificationReport {
        let mut report = VerificationReport::default();

        self.check_directories(&mut report);
        self.check_project_files(&mut report);
        self.check_environment(&mut report);
        self.check_service(&mut report, "database", self.database.as_ref(), FindingLevel::Error)
            .await;
        self.check_service(&mut report, "cache", self.cache.as_ref(), FindingLevel::Warning)
            .await;
        if let Some(workers) = &self.workers {
            self.check_service(&mut report, "workers", workers.as_ref(), FindingLevel::Warning)
                .await;
        }
        if let Some(api) = &self.api {
            self.check_service(&mut report, "api-health", api.as_ref(), FindingLevel::Warning)
                .await;
        }

        report
    }

    fn check_directories(&self, report: &mut VerificationReport) {
        for dir in &self.config.directories {
            let path = self.root.join(dir);
            if path.is_dir() {
                report.push("directories", FindingLevel::Ok, format!("{} exists", dir));
                continue;
            }

            match std::fs::create_dir_all(&path) {
                Ok(()) => report.push(
                    "directories",
                    FindingLevel::Warning,
                    format!("{} was missing and has been created", dir),
                ),
                Err(e) => report.push(
                    "directories",
                    FindingLevel::Error,
                    format!("{} is missing and could not be created: {}", dir, e),
                ),
            }
        }
    }

    fn check_project_files(&self, report: &mut VerificationReport) {
        let migrations = &self.config.migrations.directory;
        if self.root.join(migrations).is_dir() {
            report.push("migrations", FindingLevel::Ok, format!("{} initialized", migrations));
        } else {
            report.push(
                "migrations",
                FindingLevel::Warning,
                format!("{} not initialized; run bootstrap", migrations),
            );
        }

        let env_file = &self.config.environment.target;
        if self.root.join(env_file).is_file() {
            report.push("env-file", FindingLevel::Ok, format!("{} present", env_file));
        } else {
            report.push(
                "env-file",
                FindingLevel::Warning,
                format!("{} missing; copy it from {}", env_file, self.config.environment.template),
            );
        }
    }

    fn check_environment(&self, report: &mut VerificationReport) {
        for var in &self.config.verify.essential_vars {
            if (self.lookup)(var).is_some() {
                report.push("environment", FindingLevel::Ok, format!("{} set", var));
            } else {
                report.push("environment", FindingLevel::Error, format!("{} missing", var));
            }
        }

        for var in &self.config.verify.optional_vars {
            if (self.lookup)(var).is_some() {
                report.push("environment", FindingLevel::Ok, format!("{} set", var));
            } else {
                report.push("environment", FindingLevel::Warning, format!("{} not set", var));
            }
        }
    }

    async fn check_service(
        &self,
        report: &mut VerificationReport,
        check: &str,
        probe: &dyn ReadinessProbe,
        failure_level: FindingLevel,
    ) {
        match probe.probe().await {
            ProbeOutcome::Ready => report.push(
                check,
                FindingLevel::Ok,
                format!("{} reachable", probe.target()),
            ),
            ProbeOutcome::NotReady(reason) => report.push(
                check,
                failure_level,
                format!("{} unreachable: {}", probe.target(), reason),
            ),
        }
    }
}
