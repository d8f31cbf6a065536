//! Create-and-poll for Maestro runs.
//!
//! A run is created once and its status fetched every `poll_interval`
//! until it reaches a terminal state. The whole wait is bounded by
//! `run_timeout` and aborted when the shutdown token fires. Individual
//! upstream calls are retried with exponential backoff while the error is
//! transient.

use crate::config::MaestroConfig;
use crate::models::{Run, RunRequest, RunStatus};
use crate::services::metrics;
use crate::services::providers::{OrchestrationProvider, ProviderError};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub run_timeout: Duration,
    pub retry_max_elapsed: Duration,
}

impl From<&MaestroConfig> for PollSettings {
    fn from(config: &MaestroConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            run_timeout: config.run_timeout(),
            retry_max_elapsed: config.retry_max_elapsed(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("run {run_id} ended with status {status}: {reason}")]
    RunFailed {
        run_id: String,
        status: RunStatus,
        reason: String,
    },

    #[error("run did not finish within {0:?}")]
    Timeout(Duration),

    #[error("run wait cancelled by shutdown")]
    Cancelled,
}

#[derive(Clone)]
pub struct RunPoller {
    provider: Arc<dyn OrchestrationProvider>,
    settings: PollSettings,
    shutdown: CancellationToken,
}

impl RunPoller {
    pub fn new(
        provider: Arc<dyn OrchestrationProvider>,
        settings: PollSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            provider,
            settings,
            shutdown,
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Create a run and wait for it to complete.
    ///
    /// Returns the completed run; any other terminal status is an error.
    pub async fn create_and_poll(&self, request: &RunRequest) -> Result<Run, PollError> {
        let start = Instant::now();
        let wait = tokio::time::timeout(self.settings.run_timeout, self.drive(request));

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err(PollError::Cancelled),
            finished = wait => match finished {
                Ok(result) => result,
                Err(_) => Err(PollError::Timeout(self.settings.run_timeout)),
            },
        };

        let label = match &outcome {
            Ok(_) => "completed",
            Err(PollError::RunFailed { .. }) => "failed",
            Err(PollError::Timeout(_)) => "timeout",
            Err(PollError::Cancelled) => "cancelled",
            Err(PollError::Upstream(_)) => "upstream_error",
        };
        metrics::record_run_wait(label, start.elapsed().as_secs_f64());

        outcome
    }

    async fn drive(&self, request: &RunRequest) -> Result<Run, PollError> {
        let mut run = self
            .with_retry("create_run", || self.provider.create_run(request))
            .await?;
        let run_id = run.id.clone();
        tracing::info!(run_id = %run_id, status = %run.status, "Maestro run created");

        loop {
            match run.status() {
                RunStatus::Completed => {
                    tracing::info!(run_id = %run_id, "Maestro run completed");
                    return Ok(run);
                }
                status if status.is_terminal() => {
                    let reason = run.failure_reason();
                    tracing::warn!(run_id = %run_id, %status, reason = %reason, "Maestro run did not complete");
                    return Err(PollError::RunFailed {
                        run_id,
                        status,
                        reason,
                    });
                }
                _ => {}
            }

            tokio::time::sleep(self.settings.poll_interval).await;
            run = self
                .with_retry("get_run", || self.provider.get_run(&run_id))
                .await?;
            tracing::debug!(run_id = %run_id, status = %run.status, "Polled Maestro run");
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let policy = ExponentialBackoff {
            current_interval: self.settings.poll_interval,
            initial_interval: self.settings.poll_interval,
            max_elapsed_time: Some(self.settings.retry_max_elapsed),
            ..Default::default()
        };

        retry(policy, || {
            let attempt = call();
            async move {
                attempt.await.map_err(|e| {
                    if e.is_transient() {
                        tracing::warn!(operation, error = %e, "Transient upstream error, retrying");
                        metrics::record_upstream_retry(operation, e.kind());
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }
}
