use crate::config::settings::DatabaseSettings;
use crate::domain::model::{CommandSpec, ProbeOutcome};
use crate::domain::ports::{CommandRunner, ReadinessProbe};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Readiness via an external check tool, e.g. `pg_isready`. Exit 0 means ready.
pub struct CommandProbe {
    command: CommandSpec,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl CommandProbe {
    pub fn new(command: CommandSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            command,
            runner,
            timeout: None,
        }
    }

    /// Counts a check still running after `timeout` as not ready.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `pg_isready -h <host> -p <port> -U <user>`
    pub fn pg_isready(db: &DatabaseSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let command = CommandSpec::new("pg_isready")
            .arg("-h")
            .arg(db.host.clone())
            .arg("-p")
            .arg(db.port.to_string())
            .arg("-U")
            .arg(db.user.clone());
        Self::new(command, runner)
    }
}

#[async_trait]
impl ReadinessProbe for CommandProbe {
    async fn probe(&self) -> ProbeOutcome {
        let run = self.runner.run(&self.command);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    return ProbeOutcome::NotReady(format!("no answer within {:?}", limit))
                }
            },
            None => run.await,
        };

        match result {
            Ok(outcome) if outcome.success() => ProbeOutcome::Ready,
            Ok(outcome) => ProbeOutcome::NotReady(format!(
                "{} exited with {}",
                self.command.program, outcome.code
            )),
            // A missing check tool is indistinguishable from "not yet" for the caller.
            Err(e) => ProbeOutcome::NotReady(e.to_string()),
        }
    }

    fn target(&self) -> String {
        self.command.to_string()
    }
}

/// Readiness via a plain TCP connect.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn probe(&self) -> ProbeOutcome {
        let address = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => ProbeOutcome::Ready,
            Ok(Err(e)) => ProbeOutcome::NotReady(e.to_string()),
            Err(_elapsed) => ProbeOutcome::NotReady(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            )),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Health check over HTTP GET. A 2xx answer is ready unless its JSON body
/// carries a `status` other than `healthy`.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: Client,
}

impl HttpProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn probe(&self) -> ProbeOutcome {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::NotReady(e.to_string()),
        };

        tracing::debug!("Health response status: {}", response.status());
        if !response.status().is_success() {
            return ProbeOutcome::NotReady(format!("HTTP {}", response.status()));
        }

        // plain-text health endpoints count as up
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(_) => return ProbeOutcome::Ready,
        };
        match body.get("status").and_then(|status| status.as_str()) {
            None | Some("healthy") => ProbeOutcome::Ready,
            Some(other) => ProbeOutcome::NotReady(format!("status: {}", other)),
        }
    }

    fn target(&self) -> String {
        self.url.clone()
    }
}
