use anyhow::Context;
use asterion_ops::adapters::{
    CommandProbe, ExecHandoff, HttpProbe, SystemCommandRunner, TcpProbe,
};
use asterion_ops::config::cli::{
    BootstrapArgs, ConfigArgs, EntrypointArgs, ProbeKind, VerifyArgs,
};
use asterion_ops::config::settings::load_dotenv;
use asterion_ops::domain::model::{ChecklistReport, CommandSpec, FindingLevel, StepStatus};
use asterion_ops::domain::ports::ReadinessProbe;
use asterion_ops::utils::{logger, validation::Validate};
use asterion_ops::{
    BootstrapConfig, BootstrapContext, CacheSettings, Checklist, Cli, Commands, DatabaseSettings,
    Entrypoint, OpsError, ReadinessGate, Verifier,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // clap reads `env = ...` defaults at parse time
    load_dotenv(Path::new("."));
    let cli = Cli::parse();

    logger::init(cli.log_format, cli.verbose);

    let exit_code = match cli.command {
        Commands::Entrypoint(args) => run_entrypoint(args).await,
        Commands::Bootstrap(args) => run_bootstrap(args).await,
        Commands::Verify(args) => run_verify(args).await,
        Commands::Config(args) => run_config(args),
    };

    std::process::exit(exit_code);
}

fn report_failure(e: &OpsError) -> i32 {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    e.exit_code()
}

fn load_config(path: &Path) -> anyhow::Result<BootstrapConfig> {
    let config = BootstrapConfig::load_or_default(path)
        .with_context(|| format!("failed to load config file '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in '{}'", path.display()))?;
    Ok(config)
}

fn resolve_root(root: &Path) -> anyhow::Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("project root '{}' is not accessible", root.display()))
}

async fn run_entrypoint(args: EntrypointArgs) -> i32 {
    let db = match DatabaseSettings::from_env() {
        Ok(db) => db,
        Err(e) => return report_failure(&e),
    };

    let Some(migrate) = CommandSpec::parse(&args.migrate) else {
        return report_failure(&OpsError::config("migrate", "command cannot be empty"));
    };
    let Some(command) = CommandSpec::from_argv(&args.command) else {
        return report_failure(&OpsError::MissingConfigError {
            field: "command".to_string(),
        });
    };

    if args.interval == 0 {
        return report_failure(&OpsError::config("interval", "must be at least 1 second"));
    }
    let interval = Duration::from_secs(args.interval);

    let runner = Arc::new(SystemCommandRunner::new());
    let settings = EntrypointRun {
        interval,
        max_attempts: args.max_attempts,
        migrate,
        skip_migrations: args.skip_migrations,
    };

    match args.probe {
        ProbeKind::Command => {
            let probe = CommandProbe::pg_isready(&db, Arc::new(SystemCommandRunner::quiet()));
            settings.run(probe, runner, command).await
        }
        ProbeKind::Tcp => {
            let probe = TcpProbe::new(db.host.clone(), db.port);
            settings.run(probe, runner, command).await
        }
    }
}

struct EntrypointRun {
    interval: Duration,
    max_attempts: Option<u32>,
    migrate: CommandSpec,
    skip_migrations: bool,
}

impl EntrypointRun {
    async fn run<P: ReadinessProbe>(
        self,
        probe: P,
        runner: Arc<SystemCommandRunner>,
        command: CommandSpec,
    ) -> i32 {
        let gate = ReadinessGate::new(probe, self.interval).with_max_attempts(self.max_attempts);
        let entrypoint = Entrypoint::new(gate, runner, Arc::new(ExecHandoff), self.migrate)
            .skip_migrations(self.skip_migrations);

        match entrypoint.run(command).await {
            Ok(code) => code,
            Err(e) => report_failure(&e),
        }
    }
}

async fn run_bootstrap(args: BootstrapArgs) -> i32 {
    let root = match resolve_root(&args.root) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return 1;
        }
    };

    let mut config = match load_config(&root.join(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            return 1;
        }
    };

    if args.skip_tests {
        config.tests.enabled = false;
    }
    if args.skip_cache {
        config.cache.enabled = false;
    }

    tracing::info!("🚀 Bootstrapping {}", root.display());

    let ctx = BootstrapContext::new(root, Arc::new(SystemCommandRunner::new()));
    let checklist = Checklist::standard(&config);

    let report = match checklist.execute_all(&ctx).await {
        Ok(report) => report,
        Err(e) => return report_failure(&e),
    };

    display_bootstrap_summary(&report);

    if let Some(path) = &args.report {
        if let Err(e) = write_report(path, &report) {
            // report output is best-effort
            tracing::warn!("⚠️ Could not write report to {}: {}", path.display(), e);
        }
    }

    0
}

fn write_report(path: &Path, report: &ChecklistReport) -> asterion_ops::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("📁 Report saved to: {}", path.display());
    Ok(())
}

fn display_bootstrap_summary(report: &ChecklistReport) {
    println!("📋 Bootstrap Summary:");
    for step in &report.steps {
        match &step.status {
            StepStatus::Completed => println!("  ✅ {} ({:?})", step.step, step.duration),
            StepStatus::Skipped { reason } => println!("  ⏭️  {}: {}", step.step, reason),
            StepStatus::Warned { reason } => println!("  ⚠️  {}: {}", step.step, reason),
        }
    }

    let warnings = report.warnings().count();
    if warnings == 0 {
        println!("✅ Environment ready!");
    } else {
        println!("✅ Environment ready with {} warning(s)", warnings);
    }
}

async fn run_verify(args: VerifyArgs) -> i32 {
    let root = match resolve_root(&args.root) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return 1;
        }
    };

    let config = match load_config(&root.join(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return 1;
        }
    };

    load_dotenv(&root);

    let (db, cache) = match (DatabaseSettings::from_env(), CacheSettings::from_env()) {
        (Ok(db), Ok(cache)) => (db, cache),
        (Err(e), _) | (_, Err(e)) => return report_failure(&e),
    };

    let worker_probe = CommandSpec::parse(&config.verify.worker_command).map(|command| {
        let timeout = Duration::from_secs(config.verify.worker_timeout_secs);
        CommandProbe::new(
            command.current_dir(root.clone()),
            Arc::new(SystemCommandRunner::quiet()),
        )
        .with_timeout(timeout)
    });
    let health_probe = if config.verify.health_url.is_empty() {
        None
    } else {
        match HttpProbe::new(config.verify.health_url.clone()) {
            Ok(probe) => Some(probe),
            Err(e) => return report_failure(&e),
        }
    };

    let mut verifier = Verifier::new(
        root,
        config,
        Box::new(TcpProbe::new(db.host.clone(), db.port)),
        Box::new(TcpProbe::new(cache.host.clone(), cache.port)),
    );
    if let Some(probe) = worker_probe {
        verifier = verifier.with_worker_probe(Box::new(probe));
    }
    if let Some(probe) = health_probe {
        verifier = verifier.with_health_probe(Box::new(probe));
    }
    let report = verifier.run().await;

    println!("📋 Verification Summary:");
    for finding in &report.findings {
        let marker = match finding.level {
            FindingLevel::Ok => "✅",
            FindingLevel::Warning => "⚠️ ",
            FindingLevel::Error => "❌",
        };
        println!("  {} [{}] {}", marker, finding.check, finding.message);
    }

    let errors = report.count(FindingLevel::Error);
    let warnings = report.count(FindingLevel::Warning);
    if errors > 0 {
        println!(
            "❌ Found {} error(s) and {} warning(s); fix the errors and run verify again",
            errors, warnings
        );
        1
    } else if warnings > 0 {
        println!("✅ Installation usable with {} warning(s)", warnings);
        0
    } else {
        println!("🎉 All checks passed");
        0
    }
}

fn run_config(args: ConfigArgs) -> i32 {
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return 1;
        }
    };

    println!("📋 Configuration Summary:");
    println!("  Python: {} (venv: {})", config.python.interpreter, config.python.venv_dir);
    println!("  Requirements: {}", config.python.requirements);
    println!("  Directories: {}", config.directories.join(", "));
    println!("  Migrations: {} in {}", config.migrations.tool, config.migrations.directory);
    println!("  Env file: {} -> {}", config.environment.template, config.environment.target);
    if config.cache.enabled {
        println!(
            "  Cache: {} {} as {} on port {}",
            config.cache.runtime, config.cache.image, config.cache.container_name, config.cache.port
        );
    } else {
        println!("  Cache: disabled");
    }
    if config.tests.enabled {
        println!("  Tests: {}", config.tests.command);
    } else {
        println!("  Tests: disabled");
    }
    println!("  Worker check: {}", or_disabled(&config.verify.worker_command));
    println!("  Health check: {}", or_disabled(&config.verify.health_url));

    match DatabaseSettings::from_env().and_then(|db| db.redacted().database_url()) {
        Ok(url) => println!("  Database: {}", url),
        Err(e) => println!("  Database: invalid settings ({})", e),
    }
    match CacheSettings::from_env() {
        Ok(cache) => println!("  Redis: {}", cache.redis_url()),
        Err(e) => println!("  Redis: invalid settings ({})", e),
    }

    0
}

fn or_disabled(value: &str) -> &str {
    if value.trim().is_empty() {
        "disabled"
    } else {
        value
    }
}
