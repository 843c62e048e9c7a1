// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job handles
//!
//! A [`JobHandle`] tracks one remote execution of a test's command on a
//! cluster. Its status only moves forward: once terminal it stays terminal.

use crate::clock::Clock;
use crate::cluster::ClusterId;
use crate::id::RunId;
use crate::spec::{Revision, TestSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Environment variable carrying the revision under test
pub const REVISION_ENV: &str = "RT_REVISION";
/// Environment variable carrying the run id
pub const RUN_ID_ENV: &str = "RT_RUN_ID";

/// Unique identifier for a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Status of a remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Timeout,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Timeout | JobStatus::Cancelled
        )
    }

    fn can_become(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Submitted => next != JobStatus::Submitted,
            JobStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A status observation returned by the job manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub status: JobStatus,
    pub exit_code: Option<i32>,
}

impl JobReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            exit_code: None,
        }
    }

    pub fn exited(status: JobStatus, exit_code: i32) -> Self {
        Self {
            status,
            exit_code: Some(exit_code),
        }
    }
}

/// Everything the job manager needs to launch a test's workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub name: String,
    pub test_name: String,
    pub command: String,
    pub env: BTreeMap<String, String>,
    pub revision: Option<Revision>,
}

impl JobRequest {
    /// Build the request for a resolved spec
    pub fn for_spec(run_id: &RunId, spec: &TestSpec, revision: Option<&Revision>) -> Self {
        let mut env = spec.env.clone();
        env.insert(RUN_ID_ENV.to_string(), run_id.0.clone());
        if let Some(rev) = revision {
            env.insert(REVISION_ENV.to_string(), rev.0.clone());
        }
        Self {
            name: format!("{}-{}", spec.name, run_id),
            test_name: spec.name.clone(),
            command: spec.command.clone(),
            env,
            revision: revision.cloned(),
        }
    }
}

/// Handle to one submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
    /// Cluster the job runs on; the job does not own it
    pub cluster_id: ClusterId,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub submitted_at: Instant,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
}

impl JobHandle {
    pub fn new(id: impl Into<String>, cluster_id: ClusterId, clock: &impl Clock) -> Self {
        Self {
            id: JobId(id.into()),
            cluster_id,
            status: JobStatus::Submitted,
            exit_code: None,
            submitted_at: clock.now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Fold a status observation into the handle.
    ///
    /// Observations that would move the job backwards are ignored, so late
    /// or reordered reports cannot resurrect a finished job.
    pub fn apply(&self, report: JobReport, clock: &impl Clock) -> JobHandle {
        if report.status == self.status || !self.status.can_become(report.status) {
            return self.clone();
        }
        let now = clock.now();
        let mut next = JobHandle {
            status: report.status,
            exit_code: report.exit_code.or(self.exit_code),
            ..self.clone()
        };
        if next.started_at.is_none() {
            next.started_at = Some(now);
        }
        if report.status.is_terminal() {
            next.ended_at = Some(now);
        }
        next
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
