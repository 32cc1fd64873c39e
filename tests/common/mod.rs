#![allow(dead_code)]

use asterion_ops::domain::model::{CommandSpec, ExitOutcome, ProbeOutcome};
use asterion_ops::domain::ports::{CommandRunner, ProcessHandoff, ReadinessProbe};
use asterion_ops::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

type Effect = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// Records every command and answers with scripted exit codes.
///
/// A rule matches when the command line contains its pattern; the first
/// matching rule wins and unmatched commands exit 0.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, i32)>,
    unavailable: HashSet<String>,
    effect: Option<Effect>,
    pub calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_with(mut self, pattern: &str, code: i32) -> Self {
        self.rules.push((pattern.to_string(), code));
        self
    }

    pub fn without_program(mut self, program: &str) -> Self {
        self.unavailable.insert(program.to_string());
        self
    }

    /// Side effect applied to every command, used to emulate what a tool leaves on disk.
    pub fn with_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&CommandSpec) + Send + Sync + 'static,
    {
        self.effect = Some(Box::new(effect));
        self
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ExitOutcome> {
        self.calls.lock().unwrap().push(command.clone());
        if let Some(effect) = &self.effect {
            effect(command);
        }

        let line = command.to_string();
        let code = self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(ExitOutcome::new(code))
    }

    fn is_available(&self, program: &str) -> bool {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        !self.unavailable.contains(name)
    }
}

/// Not ready for the first `failures` probes, ready afterwards.
pub struct CountingProbe {
    failures: u32,
    pub calls: Arc<AtomicU32>,
}

impl CountingProbe {
    pub fn ready_after(failures: u32) -> Self {
        Self {
            failures,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn never_ready() -> Self {
        Self::ready_after(u32::MAX)
    }
}

#[async_trait]
impl ReadinessProbe for CountingProbe {
    async fn probe(&self) -> ProbeOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ProbeOutcome::NotReady("connection refused".to_string())
        } else {
            ProbeOutcome::Ready
        }
    }

    fn target(&self) -> String {
        "db:5432".to_string()
    }
}

/// Records the handoff instead of exec'ing and returns a fixed exit code.
pub struct RecordingHandoff {
    code: i32,
    pub invoked: Mutex<Vec<CommandSpec>>,
}

impl RecordingHandoff {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            code,
            invoked: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invoked.lock().unwrap().len()
    }
}

impl ProcessHandoff for RecordingHandoff {
    fn handoff(&self, command: &CommandSpec) -> Result<i32> {
        self.invoked.lock().unwrap().push(command.clone());
        Ok(self.code)
    }
}
