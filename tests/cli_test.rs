#![cfg(unix)]

use asterion_ops::adapters::find_executable;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A listening socket the TCP readiness check can connect to.
fn database() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").unwrap()
}

fn binary(exe: &str, db: &TcpListener, cwd: &Path) -> Command {
    let mut command = Command::new(exe);
    command
        .current_dir(cwd)
        .env("DB_HOST", "127.0.0.1")
        .env("DB_PORT", db.local_addr().unwrap().port().to_string())
        .env("READINESS_MAX_ATTEMPTS", "30")
        .env_remove("MIGRATE_COMMAND")
        .env_remove("READINESS_INTERVAL_SECS")
        .env_remove("RUST_LOG");
    command
}

fn entrypoint(db: &TcpListener, cwd: &Path, migrate: &str, app: &[&str]) -> Output {
    binary(env!("CARGO_BIN_EXE_asterion-ops"), db, cwd)
        .args(["entrypoint", "--probe", "tcp", "--migrate", migrate, "--"])
        .args(app)
        .output()
        .unwrap()
}

fn printed(output: &Output, line: &str) -> bool {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .any(|l| l.trim() == line)
}

#[test]
fn test_exec_handoff_returns_the_app_exit_code() {
    let db = database();
    let dir = TempDir::new().unwrap();

    let output = entrypoint(&db, dir.path(), "true", &["sh", "-c", "exit 42"]);

    assert_eq!(output.status.code(), Some(42));
}

#[test]
fn test_app_output_reaches_stdout_after_handoff() {
    let db = database();
    let dir = TempDir::new().unwrap();

    let output = entrypoint(&db, dir.path(), "true", &["sh", "-c", "echo app-started"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(printed(&output, "app-started"));
}

#[test]
fn test_failed_migration_never_execs_the_app() {
    let db = database();
    let dir = TempDir::new().unwrap();

    let output = entrypoint(&db, dir.path(), "false", &["sh", "-c", "echo app-started"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!printed(&output, "app-started"));
}

#[test]
fn test_migration_killed_by_signal_exits_137() {
    let db = database();
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("migrate.sh");
    std::fs::write(&script, "kill -9 $$\n").unwrap();

    let migrate = format!("sh {}", script.display());
    let output = entrypoint(&db, dir.path(), &migrate, &["sh", "-c", "echo app-started"]);

    assert_eq!(output.status.code(), Some(137));
    assert!(!printed(&output, "app-started"));
}

#[test]
fn test_docker_entrypoint_falls_back_to_tcp() {
    let db = database();
    let dir = TempDir::new().unwrap();

    // PATH holds only `sh`, so `pg_isready` cannot be found
    let bin = dir.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    let sh = find_executable("sh").unwrap();
    std::os::unix::fs::symlink(sh, bin.join("sh")).unwrap();

    let output = binary(env!("CARGO_BIN_EXE_docker-entrypoint"), &db, dir.path())
        .env("PATH", &bin)
        .env("MIGRATE_COMMAND", "sh -c true")
        .args(["sh", "-c", "exit 42"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(42));
}

#[test]
fn test_docker_entrypoint_without_command_fails() {
    let db = database();
    let dir = TempDir::new().unwrap();

    let output = binary(env!("CARGO_BIN_EXE_docker-entrypoint"), &db, dir.path())
        .output()
        .unwrap();

    assert_ne!(output.status.code(), Some(0));
    assert!(output.status.code().is_some());
}
