//! Container `ENTRYPOINT`: wait for the database, migrate, exec `CMD`.
//!
//! Configured only through the environment (`DB_HOST`, `DB_PORT`, `DB_USER`,
//! `READINESS_INTERVAL_SECS`, `READINESS_MAX_ATTEMPTS`, `MIGRATE_COMMAND`,
//! `LOG_FORMAT`). Falls back to a TCP probe when `pg_isready` is not
//! installed in the image.

use asterion_ops::adapters::{
    find_executable, CommandProbe, ExecHandoff, SystemCommandRunner, TcpProbe,
};
use asterion_ops::domain::model::CommandSpec;
use asterion_ops::domain::ports::ReadinessProbe;
use asterion_ops::utils::logger::{self, LogFormat};
use asterion_ops::{DatabaseSettings, Entrypoint, EntrypointSettings, OpsError, ReadinessGate};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    logger::init(LogFormat::from_env(), false);

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let exit_code = match run(argv).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("❌ {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run(argv: Vec<String>) -> asterion_ops::Result<i32> {
    let command = CommandSpec::from_argv(&argv).ok_or_else(|| OpsError::MissingConfigError {
        field: "command".to_string(),
    })?;

    let db = DatabaseSettings::from_env()?;
    let settings = EntrypointSettings::from_env()?;
    let runner = Arc::new(SystemCommandRunner::new());

    if find_executable("pg_isready").is_some() {
        let probe = CommandProbe::pg_isready(&db, Arc::new(SystemCommandRunner::quiet()));
        sequence(probe, settings, runner, command).await
    } else {
        tracing::info!("pg_isready not found; probing {}:{} over TCP", db.host, db.port);
        sequence(TcpProbe::new(db.host.clone(), db.port), settings, runner, command).await
    }
}

async fn sequence<P: ReadinessProbe>(
    probe: P,
    settings: EntrypointSettings,
    runner: Arc<SystemCommandRunner>,
    command: CommandSpec,
) -> asterion_ops::Result<i32> {
    let gate =
        ReadinessGate::new(probe, settings.interval).with_max_attempts(settings.max_attempts);
    Entrypoint::new(gate, runner, Arc::new(ExecHandoff), settings.migrate)
        .run(command)
        .await
}
