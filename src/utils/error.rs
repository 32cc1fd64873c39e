use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to start '{program}': {source}")]
    CommandSpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' failed: {details}")]
    StepFailed { step: String, details: String },

    #[error("Migration failed with exit code {code}")]
    MigrationFailed { code: i32 },

    #[error("{target} not ready after {attempts} attempts")]
    ReadinessTimeout { target: String, attempts: u32 },

    #[error("Failed to hand off to '{program}': {source}")]
    HandoffFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template file not found: {path}")]
    TemplateMissing { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Process,
    Filesystem,
    Dependency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OpsError {
    pub fn config(field: &str, message: impl Into<String>) -> Self {
        OpsError::ConfigValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn step_failed(step: &str, details: impl Into<String>) -> Self {
        OpsError::StepFailed {
            step: step.to_string(),
            details: details.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::TomlError(_)
            | OpsError::ConfigValidationError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::MissingConfigError { .. } => ErrorCategory::Configuration,
            OpsError::IoError(_)
            | OpsError::SerializationError(_)
            | OpsError::TemplateMissing { .. } => ErrorCategory::Filesystem,
            OpsError::ReadinessTimeout { .. } | OpsError::HttpError(_) => {
                ErrorCategory::Dependency
            }
            OpsError::CommandSpawnError { .. }
            | OpsError::StepFailed { .. }
            | OpsError::MigrationFailed { .. }
            | OpsError::HandoffFailed { .. } => ErrorCategory::Process,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OpsError::SerializationError(_) => ErrorSeverity::Low,
            OpsError::ReadinessTimeout { .. } => ErrorSeverity::Medium,
            OpsError::MigrationFailed { .. } | OpsError::HandoffFailed { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            OpsError::IoError(_) => "Check file permissions and available disk space".to_string(),
            OpsError::TomlError(_) => "Check the configuration file for TOML syntax errors".to_string(),
            OpsError::HttpError(_) => "Check the health URL and TLS setup".to_string(),
            OpsError::SerializationError(_) => "Check the report output path".to_string(),
            OpsError::ConfigValidationError { field, .. }
            | OpsError::InvalidConfigValueError { field, .. }
            | OpsError::MissingConfigError { field } => {
                format!("Review the '{}' setting in the config file or environment", field)
            }
            OpsError::CommandSpawnError { program, .. } => {
                format!("Make sure '{}' is installed and on PATH", program)
            }
            OpsError::StepFailed { step, .. } => {
                format!("Fix the '{}' step and re-run; completed steps are skipped", step)
            }
            OpsError::MigrationFailed { .. } => {
                "Inspect the migration tool output and the database schema state".to_string()
            }
            OpsError::ReadinessTimeout { .. } => {
                "Check that the database is running and reachable from this host".to_string()
            }
            OpsError::HandoffFailed { program, .. } => {
                format!("Make sure '{}' exists and is executable", program)
            }
            OpsError::TemplateMissing { path } => {
                format!("Create '{}' or point the config at an existing template", path)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Process => format!("Command failed: {}", self),
            ErrorCategory::Filesystem => format!("File system problem: {}", self),
            ErrorCategory::Dependency => format!("Dependency unavailable: {}", self),
        }
    }

    /// Process exit code for this error, never 0. A failed migration
    /// propagates its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            OpsError::MigrationFailed { code } if *code != 0 => *code,
            _ => match self.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failure_propagates_code() {
        let err = OpsError::MigrationFailed { code: 42 };
        assert_eq!(err.exit_code(), 42);
        assert_eq!(err.category(), ErrorCategory::Process);
    }

    #[test]
    fn test_step_failure_is_high_severity() {
        let err = OpsError::step_failed("dependencies", "exit code 1");
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("dependencies"));
        assert!(err.recovery_suggestion().contains("dependencies"));
    }

    #[test]
    fn test_every_error_exits_non_zero() {
        let io = || std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let errors = vec![
            OpsError::IoError(io()),
            OpsError::TomlError(toml::from_str::<toml::Table>("a = ").unwrap_err()),
            OpsError::SerializationError(serde_json::from_str::<i32>("x").unwrap_err()),
            OpsError::config("cache.port", "bad"),
            OpsError::MissingConfigError {
                field: "command".to_string(),
            },
            OpsError::CommandSpawnError {
                program: "pg_isready".to_string(),
                source: io(),
            },
            OpsError::MigrationFailed { code: 0 },
            OpsError::HandoffFailed {
                program: "uvicorn".to_string(),
                source: io(),
            },
            OpsError::TemplateMissing {
                path: ".env.example".to_string(),
            },
        ];

        for err in errors {
            assert_ne!(err.exit_code(), 0, "{} exits 0", err);
        }
    }

    #[test]
    fn test_readiness_timeout_is_dependency_error() {
        let err = OpsError::ReadinessTimeout {
            target: "db:5432".to_string(),
            attempts: 3,
        };
        assert_eq!(err.category(), ErrorCategory::Dependency);
        assert_eq!(err.exit_code(), 2);
        assert!(err.user_friendly_message().starts_with("Dependency unavailable"));
    }
}
