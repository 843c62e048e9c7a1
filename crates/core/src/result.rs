// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable run results

use crate::aggregate::LogSummary;
use crate::bisect::BisectReport;
use crate::id::RunId;
use crate::job::JobStatus;
use crate::outcome::{ExitCode, Outcome};
use crate::spec::{Revision, TestSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Snapshot of how one run ended. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub test_name: String,
    pub revision: Option<Revision>,
    pub smoke_test: bool,
    pub outcome: Outcome,
    pub job_status: Option<JobStatus>,
    pub exit_code: Option<i32>,
    pub metrics: BTreeMap<String, f64>,
    /// Present only when the run did not succeed
    pub error_summary: Option<String>,
    pub log_tail: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub bisect: Option<BisectReport>,
}

/// Inputs gathered by a run before its result is frozen
#[derive(Debug, Clone)]
pub struct ResultParts {
    pub run_id: RunId,
    pub outcome: Outcome,
    pub job_status: Option<JobStatus>,
    pub exit_code: Option<i32>,
    pub logs: LogSummary,
    /// Error detail from the orchestrator, used when the logs had no fatal line
    pub detail: Option<String>,
    pub duration: Duration,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub bisect: Option<BisectReport>,
}

impl RunResult {
    pub fn new(spec: &TestSpec, revision: Option<&Revision>, parts: ResultParts) -> Self {
        let error_summary = if parts.outcome.is_success() {
            None
        } else {
            Some(
                parts
                    .logs
                    .fatal_line
                    .clone()
                    .or(parts.detail.clone())
                    .unwrap_or_else(|| default_summary(parts.outcome, parts.exit_code)),
            )
        };

        Self {
            run_id: parts.run_id,
            test_name: spec.name.clone(),
            revision: revision.cloned(),
            smoke_test: spec.smoke_test,
            outcome: parts.outcome,
            job_status: parts.job_status,
            exit_code: parts.exit_code,
            metrics: parts.logs.metrics,
            error_summary,
            log_tail: parts.logs.tail,
            duration: parts.duration,
            retry_count: parts.retry_count,
            started_at: parts.started_at,
            bisect: parts.bisect,
        }
    }

    /// Process exit code for this result
    pub fn process_exit_code(&self) -> ExitCode {
        self.outcome.exit_code()
    }

    /// One-line human summary
    pub fn summary_line(&self) -> String {
        let revision = self
            .revision
            .as_ref()
            .map(|r| format!(" @ {r}"))
            .unwrap_or_default();
        let mut line = format!(
            "{}{}: {} in {} (retries: {})",
            self.test_name,
            revision,
            self.outcome,
            humantime::format_duration(round_to_secs(self.duration)),
            self.retry_count
        );
        if let Some(culprit) = self.bisect.as_ref().and_then(|b| b.culprit.as_ref()) {
            line.push_str(&format!(", first bad revision: {culprit}"));
        }
        line
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn default_summary(outcome: Outcome, exit_code: Option<i32>) -> String {
    match (outcome, exit_code) {
        (Outcome::Failed, Some(code)) => format!("job failed with exit code {code}"),
        (Outcome::TimedOut, _) => "job exceeded its timeout".to_string(),
        _ => outcome.to_string(),
    }
}

fn round_to_secs(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs())
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
