// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the release test engine

use crate::bisect::{seed_record, Bisector, ProbeRunner};
use crate::monitor::WatchSettings;
use crate::{CancelToken, EventSink, Executor, RuntimeError, Scheduler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rt_adapters::{ClusterAdapter, JobAdapter};
use rt_core::{
    BisectRange, BisectReport, Clock, Effect, EngineConfig, ErrorKind, IdGen, LogPatterns,
    LogSummary, Outcome, ResultParts, RetryPolicy, Revision, Run, RunEvent, RunResult, TestSpec,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Runtime adapter dependencies
pub struct RuntimeDeps<C, J> {
    pub clusters: C,
    pub jobs: J,
}

/// Revisions to search when a run fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectPlan {
    pub known_good: Option<Revision>,
    /// Oldest first; the last one is the known-bad revision
    pub candidates: Vec<Revision>,
}

/// One test to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub spec: TestSpec,
    pub revision: Option<Revision>,
    pub bisect: Option<BisectPlan>,
}

impl RunRequest {
    pub fn new(spec: TestSpec) -> Self {
        Self {
            spec,
            revision: None,
            bisect: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<Revision>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_bisect(mut self, plan: BisectPlan) -> Self {
        self.bisect = Some(plan);
        self
    }
}

/// Runtime that drives runs to a result
pub struct Runtime<C, J, K: Clock, I: IdGen> {
    executor: Executor<C, J, K>,
    clock: K,
    id_gen: I,
    bisector: Bisector,
    scheduler: Arc<Scheduler>,
    config: Arc<EngineConfig>,
}

impl<C, J, K, I> Clone for Runtime<C, J, K, I>
where
    C: Clone,
    J: Clone,
    K: Clock,
    I: IdGen,
{
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            clock: self.clock.clone(),
            id_gen: self.id_gen.clone(),
            bisector: self.bisector,
            scheduler: Arc::clone(&self.scheduler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C, J, K, I> Runtime<C, J, K, I>
where
    C: ClusterAdapter,
    J: JobAdapter,
    K: Clock,
    I: IdGen,
{
    /// Create a new runtime, rejecting an invalid engine config
    pub fn new(
        deps: RuntimeDeps<C, J>,
        config: EngineConfig,
        clock: K,
        id_gen: I,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let patterns = Arc::new(LogPatterns::from_config(&config.logs)?);
        let executor = Executor::new(
            deps.clusters,
            deps.jobs,
            clock.clone(),
            config.provision_timeout,
            WatchSettings::from_config(&config),
            patterns,
        );
        Ok(Self {
            executor,
            clock,
            id_gen,
            bisector: Bisector::new(config.bisect.max_probes),
            scheduler: Arc::new(Scheduler::new(&config)),
            config: Arc::new(config),
        })
    }

    /// Send lifecycle events to `events` as well as the log
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.executor = self.executor.with_events(events);
        self
    }

    /// Run one test to its result.
    ///
    /// Waits for the spec's resource class first. Always returns exactly one
    /// result; failures of every kind are reported in it.
    pub async fn run(&self, request: RunRequest, cancel: &CancelToken) -> RunResult {
        let class = request.spec.resource_class.clone();
        let lease = tokio::select! {
            lease = self.scheduler.lease(class.as_deref()) => lease,
            _ = cancel.cancelled() => Err(RuntimeError::Cancelled),
        };
        let _lease = match lease {
            Ok(lease) => lease,
            Err(e) => {
                return self.unstarted(&request, ErrorKind::Cancelled, e.to_string());
            }
        };
        self.execute_run(request, cancel).await
    }

    /// Run tests concurrently, one result per request in request order.
    ///
    /// A run task that dies without a result still gets an errored result
    /// in its slot.
    pub async fn run_batch(
        &self,
        requests: Vec<RunRequest>,
        cancel: &CancelToken,
    ) -> Vec<RunResult> {
        let tasks: Vec<_> = requests
            .iter()
            .cloned()
            .map(|request| {
                let runtime = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { runtime.run(request, &cancel).await })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (request, task) in requests.iter().zip(tasks) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(test = %request.spec.name, error = %e, "run task failed");
                    let detail = format!("run task failed: {e}");
                    self.unstarted(request, ErrorKind::Internal, detail)
                }
            };
            results.push(result);
        }
        results
    }

    async fn execute_run(&self, mut request: RunRequest, cancel: &CancelToken) -> RunResult {
        let spec = request.spec.resolved();
        if let Err(e) = spec.validate() {
            tracing::error!(test = %spec.name, error = %e, "invalid test spec");
            return self.unstarted(&request, ErrorKind::Config, e.to_string());
        }
        let range = match request.bisect.take() {
            Some(plan) => match BisectRange::new(plan.known_good, plan.candidates) {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::error!(test = %spec.name, error = %e, "invalid bisect range");
                    return self.unstarted(&request, ErrorKind::Config, e.to_string());
                }
            },
            None => None,
        };

        let policy = RetryPolicy::new(spec.retries, &self.config.backoff);
        let run = Run::new(
            self.id_gen.next_run_id(),
            spec,
            request.revision,
            policy,
            &self.clock,
        )
        .with_bisect(range.is_some());

        let span = tracing::info_span!(
            "run",
            run_id = %run.id,
            test = %run.spec.name,
            revision = ?run.revision.as_ref().map(|r| r.0.as_str()),
        );
        self.drive(run, range, cancel).instrument(span).await
    }

    /// Feed the run its own effects' answers until it reports
    async fn drive(
        &self,
        mut run: Run,
        mut range: Option<BisectRange>,
        cancel: &CancelToken,
    ) -> RunResult {
        let started_at = Utc::now();
        let mut logs = LogSummary::default();
        let mut result = None;
        let mut pending = VecDeque::new();

        self.apply(&mut run, RunEvent::Start, &mut pending);
        while let Some(effect) = pending.pop_front() {
            let event = match effect {
                Effect::Report { outcome } => {
                    let report = self.result(&run, &logs, started_at);
                    tracing::info!(%outcome, summary = %report.summary_line(), "run reported");
                    result = Some(report);
                    (!run.is_terminal()).then_some(RunEvent::Reported)
                }
                Effect::StartBisect => {
                    let report = match range.take() {
                        Some(range) => self.bisect(&run, &logs, started_at, range, cancel).await,
                        None => Ok(missing_range(&run)),
                    };
                    Some(match report {
                        Ok(report) => RunEvent::BisectConcluded { report },
                        Err(_) => RunEvent::Cancel,
                    })
                }
                effect => {
                    let executed = self
                        .executor
                        .execute(effect, run.cluster.as_ref(), cancel)
                        .await;
                    if let Some(summary) = executed.logs {
                        logs = summary;
                    }
                    if let Some(at) = executed.heartbeat {
                        self.apply(&mut run, RunEvent::ClusterHeartbeat { at }, &mut pending);
                    }
                    executed.event
                }
            };
            if let Some(event) = event {
                self.apply(&mut run, event, &mut pending);
            }
        }

        result.unwrap_or_else(|| {
            tracing::error!(state = %run.state, "run stopped without reporting");
            self.result(&run, &logs, started_at)
        })
    }

    fn apply(&self, run: &mut Run, event: RunEvent, pending: &mut VecDeque<Effect>) {
        let (next, effects) = run.transition(event, &self.clock);
        *run = next;
        pending.extend(effects);
    }

    async fn bisect(
        &self,
        run: &Run,
        logs: &LogSummary,
        started_at: DateTime<Utc>,
        mut range: BisectRange,
        cancel: &CancelToken,
    ) -> Result<BisectReport, RuntimeError> {
        // The failing run already answered for its own revision
        if let Some(seed) = seed_record(&self.result(run, logs, started_at)) {
            range.seed(seed);
        }
        tracing::info!(
            candidates = range.candidates().len(),
            known_bad = %range.known_bad(),
            "bisecting"
        );
        self.bisector.bisect(self, &run.spec, range, cancel).await
    }

    fn result(&self, run: &Run, logs: &LogSummary, started_at: DateTime<Utc>) -> RunResult {
        RunResult::new(
            &run.spec,
            run.revision.as_ref(),
            ResultParts {
                run_id: run.id.clone(),
                outcome: run
                    .outcome
                    .unwrap_or(Outcome::Errored(ErrorKind::Cancelled)),
                job_status: run.job_status(),
                exit_code: run.exit_code(),
                logs: logs.clone(),
                detail: run.detail.clone(),
                duration: run.elapsed(self.clock.now()),
                retry_count: run.retries_used,
                started_at,
                bisect: run.bisect_report.clone(),
            },
        )
    }

    /// Result for a run that never got to start
    fn unstarted(&self, request: &RunRequest, kind: ErrorKind, detail: String) -> RunResult {
        RunResult::new(
            &request.spec,
            request.revision.as_ref(),
            ResultParts {
                run_id: self.id_gen.next_run_id(),
                outcome: Outcome::Errored(kind),
                job_status: None,
                exit_code: None,
                logs: LogSummary::default(),
                detail: Some(detail),
                duration: Duration::ZERO,
                retry_count: 0,
                started_at: Utc::now(),
                bisect: None,
            },
        )
    }
}

/// Report for a bisection requested without a range to search
fn missing_range(run: &Run) -> BisectReport {
    tracing::error!("bisection requested without a range");
    BisectReport {
        known_good: None,
        known_bad: run
            .revision
            .clone()
            .unwrap_or_else(|| Revision::from("unknown")),
        culprit: None,
        probes: Vec::new(),
        inconclusive_reason: Some("no revisions to search".to_string()),
    }
}

/// Probes are fresh runs without bisection and without a lease; the
/// bisecting run already holds its resource class.
#[async_trait]
impl<C, J, K, I> ProbeRunner for Runtime<C, J, K, I>
where
    C: ClusterAdapter,
    J: JobAdapter,
    K: Clock,
    I: IdGen,
{
    async fn probe(&self, spec: &TestSpec, revision: &Revision, cancel: &CancelToken) -> RunResult {
        let request = RunRequest::new(spec.clone()).with_revision(revision.clone());
        self.execute_run(request, cancel).await
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
