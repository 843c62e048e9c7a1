// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobAdapter, JobError, LogStream};
use async_trait::async_trait;
use rt_core::{
    ClusterHandle, ClusterId, JobHandle, JobId, JobReport, JobRequest, JobStatus, LogRecord,
    Revision, SystemClock,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// How one scripted job attempt behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeJobScript {
    /// Terminal status reported once `duration` has passed
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub logs: Vec<String>,
    /// Never report any status
    pub silent: bool,
    /// Keep running forever
    pub hang: bool,
}

impl FakeJobScript {
    pub fn succeed() -> Self {
        Self {
            status: JobStatus::Succeeded,
            exit_code: Some(0),
            duration: Duration::ZERO,
            logs: Vec::new(),
            silent: false,
            hang: false,
        }
    }

    pub fn fail(exit_code: i32) -> Self {
        Self {
            status: JobStatus::Failed,
            exit_code: Some(exit_code),
            ..Self::succeed()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::succeed()
        }
    }

    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::succeed()
        }
    }

    pub fn after(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_logs(mut self, lines: &[&str]) -> Self {
        self.logs = lines.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// Recorded job call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCall {
    Submit {
        cluster_id: ClusterId,
        name: String,
        revision: Option<Revision>,
    },
    Poll {
        id: JobId,
    },
    StreamLogs {
        id: JobId,
    },
    Cancel {
        id: JobId,
    },
}

struct FakeJob {
    script: FakeJobScript,
    started: Instant,
    cancelled: bool,
}

struct FakeJobState {
    default_script: FakeJobScript,
    /// Persistent script per revision
    by_revision: HashMap<Option<Revision>, FakeJobScript>,
    /// One-shot scripts per revision, consumed before the persistent one
    attempts: HashMap<Option<Revision>, VecDeque<FakeJobScript>>,
    submit_failures: VecDeque<JobError>,
    jobs: HashMap<JobId, FakeJob>,
    next_id: u64,
}

impl Default for FakeJobState {
    fn default() -> Self {
        Self {
            default_script: FakeJobScript::succeed(),
            by_revision: HashMap::new(),
            attempts: HashMap::new(),
            submit_failures: VecDeque::new(),
            jobs: HashMap::new(),
            next_id: 0,
        }
    }
}

/// Fake job adapter for testing.
///
/// Jobs are scripted per revision; time is read from tokio so paused-time
/// tests decide exactly when a job finishes.
#[derive(Clone, Default)]
pub struct FakeJobAdapter {
    state: Arc<Mutex<FakeJobState>>,
    calls: Arc<Mutex<Vec<JobCall>>>,
}

impl FakeJobAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeJobState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script used when nothing more specific applies
    pub fn set_default(&self, script: FakeJobScript) {
        self.state().default_script = script;
    }

    /// Script every attempt at `revision`
    pub fn script(&self, revision: Option<Revision>, script: FakeJobScript) {
        self.state().by_revision.insert(revision, script);
    }

    /// Script the next attempt at `revision` only
    pub fn push_attempt(&self, revision: Option<Revision>, script: FakeJobScript) {
        self.state()
            .attempts
            .entry(revision)
            .or_default()
            .push_back(script);
    }

    /// Reject the next submission with `error`
    pub fn fail_next_submit(&self, error: JobError) {
        self.state().submit_failures.push_back(error);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<JobCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Revisions submitted so far, in order
    pub fn submitted_revisions(&self) -> Vec<Option<Revision>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                JobCall::Submit { revision, .. } => Some(revision),
                _ => None,
            })
            .collect()
    }

    /// Jobs that received a cancel call
    pub fn cancelled(&self) -> Vec<JobId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                JobCall::Cancel { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: JobCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl JobAdapter for FakeJobAdapter {
    async fn submit(
        &self,
        cluster: &ClusterHandle,
        request: &JobRequest,
    ) -> Result<JobHandle, JobError> {
        self.record(JobCall::Submit {
            cluster_id: cluster.id.clone(),
            name: request.name.clone(),
            revision: request.revision.clone(),
        });

        let mut state = self.state();
        if let Some(error) = state.submit_failures.pop_front() {
            return Err(error);
        }
        let revision = request.revision.clone();
        let script = match state.attempts.get_mut(&revision).and_then(|q| q.pop_front()) {
            Some(script) => script,
            None => state
                .by_revision
                .get(&revision)
                .cloned()
                .unwrap_or_else(|| state.default_script.clone()),
        };

        state.next_id += 1;
        let handle = JobHandle::new(
            format!("job-{}", state.next_id),
            cluster.id.clone(),
            &SystemClock,
        );
        state.jobs.insert(
            handle.id.clone(),
            FakeJob {
                script,
                started: Instant::now(),
                cancelled: false,
            },
        );
        Ok(handle)
    }

    async fn poll(&self, job: &JobHandle) -> Result<Option<JobReport>, JobError> {
        self.record(JobCall::Poll { id: job.id.clone() });

        let state = self.state();
        let fake = state
            .jobs
            .get(&job.id)
            .ok_or_else(|| JobError::NotFound(job.id.clone()))?;
        if fake.cancelled {
            return Ok(Some(JobReport::new(JobStatus::Cancelled)));
        }
        let script = &fake.script;
        if script.silent {
            return Ok(None);
        }
        if script.hang || fake.started.elapsed() < script.duration {
            return Ok(Some(JobReport::new(JobStatus::Running)));
        }
        Ok(Some(JobReport {
            status: script.status,
            exit_code: script.exit_code,
        }))
    }

    fn stream_logs(&self, job: &JobHandle) -> LogStream {
        self.record(JobCall::StreamLogs { id: job.id.clone() });

        let records: Vec<LogRecord> = self
            .state()
            .jobs
            .get(&job.id)
            .map(|fake| {
                fake.script
                    .logs
                    .iter()
                    .map(|line| LogRecord::stdout(Duration::ZERO, line.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Box::pin(tokio_stream::iter(records))
    }

    async fn cancel(&self, job: &JobHandle) -> Result<(), JobError> {
        self.record(JobCall::Cancel { id: job.id.clone() });
        if let Some(fake) = self.state().jobs.get_mut(&job.id) {
            fake.cancelled = true;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
