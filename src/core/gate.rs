use crate::domain::model::{GateReport, ProbeOutcome};
use crate::domain::ports::ReadinessProbe;
use crate::utils::error::{OpsError, Result};
use std::time::{Duration, Instant};

/// Polls a readiness probe at a fixed interval until it reports ready.
///
/// Without `max_attempts` the wait is unbounded: a dependency that never
/// comes up keeps the caller here forever. Failed probes are expected while
/// the dependency starts and are only logged at debug level.
pub struct ReadinessGate<P: ReadinessProbe> {
    probe: P,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl<P: ReadinessProbe> ReadinessGate<P> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(probe: P, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.filter(|n| *n > 0);
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub async fn wait(&self) -> Result<GateReport> {
        let start = Instant::now();
        let target = self.probe.target();
        let mut attempts: u32 = 0;

        tracing::info!("⏳ Waiting for {} to become ready", target);

        loop {
            attempts = attempts.saturating_add(1);

            match self.probe.probe().await {
                ProbeOutcome::Ready => {
                    let report = GateReport {
                        attempts,
                        waited: start.elapsed(),
                    };
                    tracing::info!(
                        "✅ {} is ready (attempts: {}, waited: {:?})",
                        target,
                        report.attempts,
                        report.waited
                    );
                    return Ok(report);
                }
                ProbeOutcome::NotReady(reason) => {
                    tracing::debug!("{} not ready (attempt {}): {}", target, attempts, reason);
                }
            }

            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(OpsError::ReadinessTimeout { target, attempts });
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Reports not-ready for the first `failures` probes.
    struct FlakyProbe {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyProbe {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ReadinessProbe for FlakyProbe {
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

    #[tokio::test]
    async fn test_ready_immediately() {
        let gate = ReadinessGate::new(FlakyProbe::new(0), Duration::from_millis(1));
        let report = gate.wait().await.unwrap();
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_until_ready() {
        let gate = ReadinessGate::new(FlakyProbe::new(4), Duration::from_millis(5));
        let report = gate.wait().await.unwrap();

        assert_eq!(report.attempts, 5);
        assert_eq!(gate.probe().calls.load(Ordering::SeqCst), 5);
        // one sleep per failed probe
        assert!(report.waited >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_max_attempts_exhausted() {
        let gate = ReadinessGate::new(FlakyProbe::new(u32::MAX), Duration::from_millis(1))
            .with_max_attempts(Some(3));

        let err = gate.wait().await.unwrap_err();
        match err {
            OpsError::ReadinessTimeout { target, attempts } => {
                assert_eq!(target, "db:5432");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(gate.probe().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_means_unbounded() {
        let gate = ReadinessGate::new(FlakyProbe::new(2), Duration::from_millis(1))
            .with_max_attempts(Some(0));
        assert_eq!(gate.wait().await.unwrap().attempts, 3);
    }
}
