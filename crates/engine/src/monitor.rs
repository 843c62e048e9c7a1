// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job monitoring.
//!
//! Watches one submitted job until something the run state machine has to
//! act on happens: a terminal job status, the test deadline, a job that
//! never reports, a dead cluster, or an operator abort. Output is folded
//! through a fresh log aggregator while waiting.

use crate::CancelToken;
use rt_adapters::{ClusterAdapter, JobAdapter, LogStream};
use rt_core::{
    Clock, ClusterHandle, EngineConfig, JobHandle, LogAggregator, LogPatterns, LogSummary,
    RunEvent,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::StreamExt;

/// Timing knobs for the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub submission_grace: Duration,
    pub heartbeat_interval: Duration,
    pub log_drain_timeout: Duration,
}

impl WatchSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            submission_grace: config.submission_grace,
            heartbeat_interval: config.heartbeat_interval,
            log_drain_timeout: config.log_drain_timeout,
        }
    }
}

/// What the watch loop saw
#[derive(Debug, Clone, PartialEq)]
pub struct Watched {
    /// The event to feed back into the run
    pub event: RunEvent,
    pub logs: LogSummary,
    /// When the cluster last answered a heartbeat during the watch
    pub last_heartbeat: Option<Instant>,
}

/// Everything the watch loop needs for one job
pub struct JobWatch<'a, C, J, K> {
    pub clusters: &'a C,
    pub jobs: &'a J,
    pub clock: &'a K,
    pub settings: WatchSettings,
    pub patterns: Arc<LogPatterns>,
    pub cancel: &'a CancelToken,
}

impl<C, J, K> JobWatch<'_, C, J, K>
where
    C: ClusterAdapter,
    J: JobAdapter,
    K: Clock,
{
    /// Watch `job` until the run has something to decide.
    ///
    /// `timeout` counts from the moment watching starts. The cluster, when
    /// given, is heartbeated every `heartbeat_interval`.
    pub async fn watch(
        &self,
        job: &JobHandle,
        cluster: Option<&ClusterHandle>,
        timeout: Duration,
    ) -> Watched {
        let started = self.clock.now();
        let mut aggregator = LogAggregator::new(Arc::clone(&self.patterns));
        let mut logs: LogStream = self.jobs.stream_logs(job);
        let mut logs_open = true;
        let mut last_probe = started;
        let mut last_heartbeat = None;
        let mut reported = false;

        loop {
            match self.jobs.poll(job).await {
                Ok(Some(report)) => {
                    reported = true;
                    if report.status.is_terminal() {
                        if logs_open {
                            self.drain(&mut logs, &mut aggregator).await;
                        }
                        tracing::info!(
                            job_id = %job.id,
                            status = %report.status,
                            exit_code = ?report.exit_code,
                            "job finished"
                        );
                        return Watched {
                            event: RunEvent::JobUpdated { report },
                            logs: aggregator.finish(),
                            last_heartbeat,
                        };
                    }
                }
                Ok(None) => {}
                // A failed poll is not a status; the grace period and deadline still apply
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "poll failed"),
            }

            let now = self.clock.now();
            let elapsed = now.saturating_duration_since(started);
            if elapsed >= timeout {
                tracing::warn!(job_id = %job.id, ?timeout, "job exceeded its timeout");
                return Watched {
                    event: RunEvent::DeadlineExceeded,
                    logs: aggregator.finish(),
                    last_heartbeat,
                };
            }
            if !reported && elapsed >= self.settings.submission_grace {
                tracing::warn!(job_id = %job.id, "job never reported a status");
                return Watched {
                    event: RunEvent::JobLost,
                    logs: aggregator.finish(),
                    last_heartbeat,
                };
            }
            if let Some(cluster) = cluster {
                if self.heartbeat_due(last_probe, now) {
                    last_probe = now;
                    if self.clusters.heartbeat(cluster).await {
                        last_heartbeat = Some(now);
                    } else {
                        tracing::warn!(cluster_id = %cluster.id, "cluster lost");
                        return Watched {
                            event: RunEvent::ClusterLost,
                            logs: aggregator.finish(),
                            last_heartbeat,
                        };
                    }
                }
            }

            let wait = self.next_wait(elapsed, timeout, reported);
            let tick = self.clock.sleep(wait);
            tokio::pin!(tick);
            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return Watched {
                            event: RunEvent::Cancel,
                            logs: aggregator.finish(),
                            last_heartbeat,
                        };
                    }
                    record = logs.next(), if logs_open => match record {
                        Some(record) => aggregator.push(&record),
                        None => logs_open = false,
                    },
                    _ = &mut tick => break,
                }
            }
        }
    }

    fn heartbeat_due(&self, last: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last) >= self.settings.heartbeat_interval
    }

    /// Sleep until the next poll, but never past the deadline or grace period
    fn next_wait(&self, elapsed: Duration, timeout: Duration, reported: bool) -> Duration {
        let mut wait = self.settings.poll_interval.min(timeout - elapsed);
        if !reported {
            let grace_left = self.settings.submission_grace.saturating_sub(elapsed);
            wait = wait.min(grace_left);
        }
        wait.max(Duration::from_millis(1))
    }

    /// Read what is left of the log stream, bounded by the drain timeout
    async fn drain(&self, logs: &mut LogStream, aggregator: &mut LogAggregator) {
        let read_all = async {
            while let Some(record) = logs.next().await {
                aggregator.push(&record);
            }
        };
        tokio::select! {
            _ = read_all => {}
            _ = self.clock.sleep(self.settings.log_drain_timeout) => {
                tracing::warn!(
                    timeout = ?self.settings.log_drain_timeout,
                    "log stream did not finish draining"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
