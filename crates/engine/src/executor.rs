// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use crate::monitor::{JobWatch, WatchSettings};
use crate::{CancelToken, EventSink};
use rt_adapters::{ClusterAdapter, JobAdapter};
use rt_core::{Clock, ClusterHandle, Effect, LogPatterns, LogSummary, RunEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of executing one effect
#[derive(Debug, Default)]
pub struct Executed {
    /// Event to feed back into the run, if the effect produced one
    pub event: Option<RunEvent>,
    /// Aggregated job output, set by `WatchJob`
    pub logs: Option<LogSummary>,
    /// Last successful cluster heartbeat, set by `WatchJob`
    pub heartbeat: Option<Instant>,
}

impl Executed {
    fn none() -> Self {
        Self::default()
    }

    fn event(event: RunEvent) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }
}

/// Executes run effects against the cluster and job adapters.
///
/// `StartBisect` and `Report` need the whole run and are handled by the
/// runtime; everything else lands here.
#[derive(Clone)]
pub struct Executor<C, J, K> {
    clusters: C,
    jobs: J,
    clock: K,
    provision_timeout: Duration,
    watch: WatchSettings,
    patterns: Arc<LogPatterns>,
    events: EventSink,
}

impl<C, J, K> Executor<C, J, K>
where
    C: ClusterAdapter,
    J: JobAdapter,
    K: Clock,
{
    pub fn new(
        clusters: C,
        jobs: J,
        clock: K,
        provision_timeout: Duration,
        watch: WatchSettings,
        patterns: Arc<LogPatterns>,
    ) -> Self {
        Self {
            clusters,
            jobs,
            clock,
            provision_timeout,
            watch,
            patterns,
            events: EventSink::none(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Execute a single effect with tracing.
    ///
    /// `cluster` is the run's current cluster, heartbeated while a job is
    /// watched. Adapter failures come back as run events, never as errors.
    pub async fn execute(
        &self,
        effect: Effect,
        cluster: Option<&ClusterHandle>,
        cancel: &CancelToken,
    ) -> Executed {
        use rt_core::TracedEffect;
        use tracing::Instrument;

        let span = tracing::info_span!("effect", effect = effect.name());
        async {
            tracing::debug!(fields = ?effect.fields(), "executing");

            let start = Instant::now();
            let executed = self.execute_inner(effect, cluster, cancel).await;

            tracing::debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                event = ?executed.event.as_ref().map(RunEvent::name),
                "completed"
            );
            executed
        }
        .instrument(span)
        .await
    }

    async fn execute_inner(
        &self,
        effect: Effect,
        cluster: Option<&ClusterHandle>,
        cancel: &CancelToken,
    ) -> Executed {
        match effect {
            Effect::Emit(event) => {
                self.events.emit(event);
                Executed::none()
            }

            Effect::AcquireCluster { request } => {
                if cancel.is_cancelled() {
                    return Executed::event(RunEvent::Cancel);
                }
                let event = tokio::select! {
                    result = self.clusters.acquire(&request) => match result {
                        Ok(cluster) => RunEvent::ClusterAcquired { cluster },
                        Err(e) => RunEvent::ClusterFailed {
                            retryable: e.retryable,
                            cause: e.cause,
                        },
                    },
                    _ = self.clock.sleep(self.provision_timeout) => {
                        tracing::warn!(
                            name = %request.name,
                            timeout = ?self.provision_timeout,
                            "cluster not ready in time"
                        );
                        RunEvent::ProvisionTimedOut
                    }
                    _ = cancel.cancelled() => RunEvent::Cancel,
                };
                Executed::event(event)
            }

            // Teardown failures are logged and never escalate
            Effect::AbandonCluster { request } => {
                if let Err(e) = self.clusters.abandon(&request).await {
                    tracing::warn!(name = %request.name, error = %e, "abandon failed");
                }
                Executed::none()
            }

            Effect::ReleaseCluster { cluster } => {
                if let Err(e) = self.clusters.release(&cluster).await {
                    tracing::warn!(cluster_id = %cluster.id, error = %e, "release failed");
                }
                Executed::none()
            }

            Effect::SubmitJob { cluster, request } => {
                if cancel.is_cancelled() {
                    return Executed::event(RunEvent::Cancel);
                }
                let event = match self.jobs.submit(&cluster, &request).await {
                    Ok(job) => RunEvent::JobSubmitted { job },
                    Err(e) => RunEvent::SubmitFailed {
                        retryable: e.is_retryable(),
                        cause: e.to_string(),
                    },
                };
                Executed::event(event)
            }

            Effect::WatchJob { job, timeout } => {
                let watch = JobWatch {
                    clusters: &self.clusters,
                    jobs: &self.jobs,
                    clock: &self.clock,
                    settings: self.watch,
                    patterns: Arc::clone(&self.patterns),
                    cancel,
                };
                let watched = watch.watch(&job, cluster, timeout).await;
                Executed {
                    event: Some(watched.event),
                    logs: Some(watched.logs),
                    heartbeat: watched.last_heartbeat,
                }
            }

            Effect::CancelJob { job } => {
                if let Err(e) = self.jobs.cancel(&job).await {
                    tracing::warn!(job_id = %job.id, error = %e, "cancel failed");
                }
                Executed::none()
            }

            Effect::Backoff { delay } => {
                let event = tokio::select! {
                    _ = self.clock.sleep(delay) => RunEvent::BackoffElapsed,
                    _ = cancel.cancelled() => RunEvent::Cancel,
                };
                Executed::event(event)
            }

            Effect::StartBisect | Effect::Report { .. } => {
                tracing::debug!("left to the runtime");
                Executed::none()
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
