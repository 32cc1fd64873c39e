use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// An external command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
        }
    }

    /// Splits a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            env: Vec::new(),
            working_dir: None,
        })
    }

    /// Builds a command from argv-style parts, as received after `--` on a command line.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: Vec::new(),
            working_dir: None,
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `128 + signal` when the process was killed by a signal.
    pub code: i32,
    pub duration: Duration,
}

impl ExitOutcome {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            duration: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    NotReady(String),
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Fatal,
    Advisory,
}

/// Outcome of a checklist step that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Skipped { reason: String },
    Warned { reason: String },
}

impl StepStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepStatus::Skipped {
            reason: reason.into(),
        }
    }

    pub fn warned(reason: impl Into<String>) -> Self {
        StepStatus::Warned {
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepStatus::Skipped { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, StepStatus::Warned { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistReport {
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl ChecklistReport {
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == name)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status.is_warning())
    }

    pub fn summary(&self) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let skipped = self.steps.iter().filter(|s| s.status.is_skipped()).count();
        let warned = self.warnings().count();
        let total_duration: Duration = self.steps.iter().map(|s| s.duration).sum();

        summary.insert("total_steps".to_string(), serde_json::Value::Number(self.steps.len().into()));
        summary.insert("completed".to_string(), serde_json::Value::Number(completed.into()));
        summary.insert("skipped".to_string(), serde_json::Value::Number(skipped.into()));
        summary.insert("warnings".to_string(), serde_json::Value::Number(warned.into()));
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let names: Vec<serde_json::Value> = self
            .steps
            .iter()
            .map(|s| serde_json::Value::String(s.step.clone()))
            .collect();
        summary.insert("executed_steps".to_string(), serde_json::Value::Array(names));

        summary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateReport {
    pub attempts: u32,
    pub waited: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub level: FindingLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    pub findings: Vec<Finding>,
}

impl VerificationReport {
    pub fn push(&mut self, check: &str, level: FindingLevel, message: impl Into<String>) {
        self.findings.push(Finding {
            check: check.to_string(),
            level,
            message: message.into(),
        });
    }

    pub fn count(&self, level: FindingLevel) -> usize {
        self.findings.iter().filter(|f| f.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(FindingLevel::Error) > 0
    }

    pub fn for_check<'a>(&'a self, check: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.check == check)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_parse() {
        let spec = CommandSpec::parse("alembic upgrade head").unwrap();
        assert_eq!(spec.program, "alembic");
        assert_eq!(spec.args, vec!["upgrade", "head"]);
        assert_eq!(spec.to_string(), "alembic upgrade head");

        assert!(CommandSpec::parse("   ").is_none());
    }

    #[test]
    fn test_command_spec_from_argv() {
        let argv = vec!["uvicorn".to_string(), "app.main:app".to_string()];
        let spec = CommandSpec::from_argv(&argv).unwrap();
        assert_eq!(spec.program, "uvicorn");
        assert_eq!(spec.args, vec!["app.main:app"]);

        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[test]
    fn test_checklist_report_summary() {
        let now = Utc::now();
        let report = ChecklistReport {
            execution_id: "bootstrap".to_string(),
            started_at: now,
            finished_at: now,
            steps: vec![
                StepReport {
                    step: "virtualenv".to_string(),
                    status: StepStatus::Completed,
                    duration: Duration::from_millis(100),
                },
                StepReport {
                    step: "env-file".to_string(),
                    status: StepStatus::skipped(".env already exists"),
                    duration: Duration::from_millis(0),
                },
                StepReport {
                    step: "tests".to_string(),
                    status: StepStatus::warned("exit code 1"),
                    duration: Duration::from_millis(200),
                },
            ],
        };

        let summary = report.summary();
        assert_eq!(summary.get("total_steps").unwrap(), &serde_json::Value::Number(3.into()));
        assert_eq!(summary.get("completed").unwrap(), &serde_json::Value::Number(1.into()));
        assert_eq!(summary.get("skipped").unwrap(), &serde_json::Value::Number(1.into()));
        assert_eq!(summary.get("warnings").unwrap(), &serde_json::Value::Number(1.into()));
        assert_eq!(summary.get("total_duration_ms").unwrap(), &serde_json::Value::Number(300.into()));
    }

    #[test]
    fn test_step_report_serializes_flat_status() {
        let report = StepReport {
            step: "cache-service".to_string(),
            status: StepStatus::warned("docker not found"),
            duration: Duration::from_millis(5),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["step"], "cache-service");
        assert_eq!(json["status"], "warned");
        assert_eq!(json["reason"], "docker not found");
        assert_eq!(json["duration"], 5);
    }

    #[test]
    fn test_verification_report_counts() {
        let mut report = VerificationReport::default();
        report.push("env", FindingLevel::Error, "SECRET_KEY missing");
        report.push("cache", FindingLevel::Warning, "unreachable");
        report.push("dirs", FindingLevel::Ok, "logs exists");

        assert!(report.has_errors());
        assert_eq!(report.count(FindingLevel::Warning), 1);
        assert_eq!(report.for_check("env").count(), 1);
    }
}
