// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bisection engine.
//!
//! Drives the pure [`BisectRange`] search with real probe runs. Each probe
//! tests one revision up to `retries + 1` times and settles on the strict
//! majority; probes run one after another.

use crate::{CancelToken, RuntimeError};
use async_trait::async_trait;
use rt_core::{
    BisectRange, BisectReport, BisectStep, ErrorKind, Outcome, ProbeRecord, ProbeTally, Revision,
    RunResult, TestSpec, Verdict,
};

/// Runs one fresh, non-bisecting attempt of a test at a revision
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn probe(&self, spec: &TestSpec, revision: &Revision, cancel: &CancelToken) -> RunResult;
}

/// Binary search for the first bad revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bisector {
    max_probes: u32,
}

impl Bisector {
    pub fn new(max_probes: u32) -> Self {
        Self { max_probes }
    }

    /// Search `range` until a culprit is found or the search gives up.
    ///
    /// Only cancellation is an error; every other way the search can end is
    /// recorded in the returned report.
    pub async fn bisect<P: ProbeRunner>(
        &self,
        probes: &P,
        spec: &TestSpec,
        mut range: BisectRange,
        cancel: &CancelToken,
    ) -> Result<BisectReport, RuntimeError> {
        let attempts = spec.retries.saturating_add(1);
        loop {
            let (index, revision) = match range.next_step() {
                BisectStep::Found { index, revision } => {
                    tracing::info!(
                        test = %spec.name,
                        %revision,
                        index,
                        probes = range.probe_count(),
                        "first bad revision found"
                    );
                    return Ok(range.report());
                }
                BisectStep::Inconclusive { reason } => {
                    tracing::warn!(test = %spec.name, %reason, "bisection inconclusive");
                    range.abandon(reason);
                    return Ok(range.report());
                }
                BisectStep::Probe { index, revision } => (index, revision),
            };

            if range.probe_count() >= self.max_probes as usize {
                let reason = format!("probe limit of {} reached", self.max_probes);
                tracing::warn!(test = %spec.name, %reason, "bisection inconclusive");
                range.abandon(reason);
                return Ok(range.report());
            }

            tracing::info!(test = %spec.name, %revision, index, "probing");
            let mut tally = ProbeTally::new(attempts);
            let mut last = None;
            let verdict = loop {
                if let Some(verdict) = tally.verdict() {
                    break verdict;
                }
                if cancel.is_cancelled() {
                    return Err(RuntimeError::Cancelled);
                }
                let result = probes.probe(spec, &revision, cancel).await;
                if result.outcome == Outcome::Errored(ErrorKind::Cancelled) {
                    return Err(RuntimeError::Cancelled);
                }
                tracing::debug!(
                    %revision,
                    attempt = tally.attempts() + 1,
                    outcome = %result.outcome,
                    "probe attempt finished"
                );
                tally.record(result.outcome);
                last = Some(result);
            };

            tracing::info!(%revision, %verdict, attempts = tally.attempts(), "probe settled");
            range.record(ProbeRecord {
                revision,
                verdict,
                attempts: tally.attempts(),
                result: last,
            });
        }
    }
}

/// The verdict a finished top-level run contributes to its own search
pub fn seed_record(result: &RunResult) -> Option<ProbeRecord> {
    let revision = result.revision.clone()?;
    let verdict = Verdict::of(result.outcome);
    (verdict != Verdict::Inconclusive).then(|| ProbeRecord {
        revision,
        verdict,
        attempts: 1,
        result: Some(result.clone()),
    })
}

#[cfg(test)]
#[path = "bisect_tests.rs"]
mod tests;
