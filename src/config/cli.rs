use crate::utils::logger::LogFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "asterion-ops")]
#[command(about = "Container entrypoint and developer bootstrap for the Asterion backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Wait for the database, run migrations, then exec the given command
    Entrypoint(EntrypointArgs),
    /// Prepare a local development environment
    Bootstrap(BootstrapArgs),
    /// Check an installation and report problems
    Verify(VerifyArgs),
    /// Print the resolved bootstrap configuration
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbeKind {
    /// Run `pg_isready` against the database
    Command,
    /// Open a TCP connection to the database port
    Tcp,
}

#[derive(Debug, Clone, Args)]
pub struct EntrypointArgs {
    #[arg(long, value_enum, default_value = "command")]
    pub probe: ProbeKind,

    /// Seconds between readiness probes
    #[arg(long, env = "READINESS_INTERVAL_SECS", default_value = "1")]
    pub interval: u64,

    /// Give up after this many probes (default: wait forever)
    #[arg(long, env = "READINESS_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Migration command line
    #[arg(long, env = "MIGRATE_COMMAND", default_value = "alembic upgrade head")]
    pub migrate: String,

    #[arg(long)]
    pub skip_migrations: bool,

    /// Command to exec once the database is ready and migrated
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BootstrapArgs {
    #[arg(short, long, default_value = "bootstrap.toml")]
    pub config: PathBuf,

    /// Project root the checklist operates in
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    #[arg(long)]
    pub skip_tests: bool,

    #[arg(long)]
    pub skip_cache: bool,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[arg(short, long, default_value = "bootstrap.toml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[arg(short, long, default_value = "bootstrap.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entrypoint_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "asterion-ops",
            "entrypoint",
            "--probe",
            "tcp",
            "--max-attempts",
            "10",
            "--",
            "uvicorn",
            "app.main:app",
            "--host",
            "0.0.0.0",
        ])
        .unwrap();

        match cli.command {
            Commands::Entrypoint(args) => {
                assert_eq!(args.probe, ProbeKind::Tcp);
                assert_eq!(args.max_attempts, Some(10));
                assert_eq!(args.command, vec!["uvicorn", "app.main:app", "--host", "0.0.0.0"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_entrypoint_requires_command() {
        assert!(Cli::try_parse_from(["asterion-ops", "entrypoint"]).is_err());
    }

    #[test]
    fn test_parse_bootstrap_flags() {
        let cli = Cli::try_parse_from([
            "asterion-ops",
            "--verbose",
            "bootstrap",
            "--root",
            "/srv/app",
            "--skip-tests",
            "--report",
            "report.json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Bootstrap(args) => {
                assert_eq!(args.root, PathBuf::from("/srv/app"));
                assert!(args.skip_tests);
                assert!(!args.skip_cache);
                assert_eq!(args.report, Some(PathBuf::from("report.json")));
                assert_eq!(args.config, PathBuf::from("bootstrap.toml"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
