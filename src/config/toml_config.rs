use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{
    validate_command, validate_non_empty_string, validate_path, validate_port, validate_range,
    validate_relative_path, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bootstrap checklist configuration, usually `bootstrap.toml` at the project root.
/// Every section is optional; a missing file means all defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub directories: Vec<String>,
    pub python: PythonConfig,
    pub migrations: MigrationsConfig,
    pub environment: EnvironmentConfig,
    pub cache: CacheConfig,
    pub tests: TestsConfig,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub interpreter: String,
    pub venv_dir: String,
    pub requirements: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub tool: String,
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub template: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub runtime: String,
    pub container_name: String,
    pub image: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    pub enabled: bool,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub essential_vars: Vec<String>,
    pub optional_vars: Vec<String>,
    /// Exits 0 when background workers answer. Empty disables the check.
    pub worker_command: String,
    pub worker_timeout_secs: u64,
    /// API health endpoint. Empty disables the check.
    pub health_url: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            directories: ["logs", "exports", "ml_models", "uploads"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            python: PythonConfig::default(),
            migrations: MigrationsConfig::default(),
            environment: EnvironmentConfig::default(),
            cache: CacheConfig::default(),
            tests: TestsConfig::default(),
            verify: VerifyConfig::default(),
        }
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: if cfg!(windows) { "python" } else { "python3" }.to_string(),
            venv_dir: "venv".to_string(),
            requirements: "requirements.txt".to_string(),
        }
    }
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            tool: "alembic".to_string(),
            directory: "alembic".to_string(),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            template: ".env.example".to_string(),
            target: ".env".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runtime: "docker".to_string(),
            container_name: "asterion-redis".to_string(),
            image: "redis:7-alpine".to_string(),
            port: 6379,
        }
    }
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "pytest tests/ -v".to_string(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            essential_vars: ["SECRET_KEY", "DATABASE_URL", "REDIS_URL"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            optional_vars: [
                "GOOGLE_GEMINI_API_KEY",
                "OPENWEATHER_API_KEY",
                "SMTP_USER",
                "SMTP_PASSWORD",
                "WHATSAPP_API_TOKEN",
                "STRIPE_SECRET_KEY",
            ]
            .iter()
            .map(|v| v.to_string())
            .collect(),
            worker_command: "celery -A app.tasks inspect active".to_string(),
            worker_timeout_secs: 5,
            health_url: "http://localhost:8000/health".to_string(),
        }
    }
}

impl BootstrapConfig {
    /// Loads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OpsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses TOML after substituting `${VAR}` references.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the variable's value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OpsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        for dir in &self.directories {
            validate_relative_path("directories", dir)?;
        }

        validate_non_empty_string("python.interpreter", &self.python.interpreter)?;
        validate_relative_path("python.venv_dir", &self.python.venv_dir)?;
        validate_path("python.requirements", &self.python.requirements)?;

        validate_non_empty_string("migrations.tool", &self.migrations.tool)?;
        validate_relative_path("migrations.directory", &self.migrations.directory)?;

        validate_path("environment.template", &self.environment.template)?;
        validate_path("environment.target", &self.environment.target)?;
        if self.environment.template == self.environment.target {
            return Err(OpsError::InvalidConfigValueError {
                field: "environment.target".to_string(),
                value: self.environment.target.clone(),
                reason: "Target must differ from the template".to_string(),
            });
        }

        if self.cache.enabled {
            validate_non_empty_string("cache.runtime", &self.cache.runtime)?;
            validate_non_empty_string("cache.container_name", &self.cache.container_name)?;
            validate_non_empty_string("cache.image", &self.cache.image)?;
            validate_port("cache.port", self.cache.port)?;
        }

        if self.tests.enabled {
            validate_command("tests.command", &self.tests.command)?;
        }

        if !self.verify.worker_command.trim().is_empty() {
            validate_range("verify.worker_timeout_secs", self.verify.worker_timeout_secs, 1, 300)?;
        }
        if !self.verify.health_url.is_empty() {
            validate_url("verify.health_url", &self.verify.health_url)?;
        }

        Ok(())
    }
}

impl Validate for BootstrapConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
