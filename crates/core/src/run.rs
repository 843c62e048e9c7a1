// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run state machine
//!
//! A run drives one test at one revision from submission to verdict:
//! acquire a cluster, run the job on it, classify how it ended, optionally
//! hand the failure to the bisection engine, then report. The machine is
//! pure; the engine executes its effects and feeds the answers back as
//! [`RunEvent`]s.
//!
//! Every path out of a state that holds a cluster requests its release, and
//! release always comes before the report. A handle the cluster manager hands
//! over is released even when it never became ready.
//!
//! A failure handed to bisection moves from `JobRunning` straight to
//! `Bisecting`. The verdict it would have settled in (`Failed` or `TimedOut`)
//! is kept in [`Run::outcome`] and reported when bisection finds a culprit.

use crate::bisect::BisectReport;
use crate::clock::Clock;
use crate::cluster::{ClusterHandle, ClusterRequest, ClusterStatus};
use crate::effect::{Effect, Event};
use crate::id::RunId;
use crate::job::{JobHandle, JobReport, JobRequest, JobStatus};
use crate::outcome::{ErrorKind, Outcome};
use crate::retry::RetryPolicy;
use crate::spec::{Revision, TestSpec};
use std::time::{Duration, Instant};

/// The state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, nothing requested yet
    Pending,
    /// Waiting for the cluster manager; `attempt` counts acquisitions started
    ClusterStarting { attempt: u32 },
    /// Cluster is ready; the job is being submitted
    ClusterReady,
    /// Job submitted and being watched
    JobRunning,
    /// Job succeeded; waiting for the report to be published
    Succeeded,
    /// Job failed; waiting for the report to be published
    Failed,
    /// Job exceeded the test timeout; waiting for the report to be published
    TimedOut,
    /// Failure handed to the bisection engine
    Bisecting,
    /// Result published
    Reported,
    /// Run ended without a test verdict
    Errored(ErrorKind),
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Reported | RunState::Errored(_))
    }

    pub fn name(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::ClusterStarting { .. } => "cluster_starting",
            RunState::ClusterReady => "cluster_ready",
            RunState::JobRunning => "job_running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::TimedOut => "timed_out",
            RunState::Bisecting => "bisecting",
            RunState::Reported => "reported",
            RunState::Errored(_) => "errored",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::ClusterStarting { attempt } => write!(f, "cluster_starting({attempt})"),
            RunState::Errored(kind) => write!(f, "errored({kind})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Events that can change run state
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Begin the run
    Start,
    /// The cluster manager handed over a cluster
    ClusterAcquired { cluster: ClusterHandle },
    /// The cluster manager refused or failed the request
    ClusterFailed { retryable: bool, cause: String },
    /// No ready cluster within the provisioning timeout
    ProvisionTimedOut,
    /// The job manager accepted the job
    JobSubmitted { job: JobHandle },
    /// The job manager rejected the job
    SubmitFailed { retryable: bool, cause: String },
    /// A status observation for the running job
    JobUpdated { report: JobReport },
    /// The test timeout elapsed while the job was running
    DeadlineExceeded,
    /// The job never reported a status within the submission grace period
    JobLost,
    /// The cluster answered a heartbeat while the job was running
    ClusterHeartbeat { at: Instant },
    /// A heartbeat found the cluster dead while the job was running
    ClusterLost,
    /// A requested backoff has passed
    BackoffElapsed,
    /// The bisection engine finished
    BisectConcluded { report: BisectReport },
    /// Operator abort
    Cancel,
    /// The result has been published
    Reported,
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Start => "start",
            RunEvent::ClusterAcquired { .. } => "cluster_acquired",
            RunEvent::ClusterFailed { .. } => "cluster_failed",
            RunEvent::ProvisionTimedOut => "provision_timed_out",
            RunEvent::JobSubmitted { .. } => "job_submitted",
            RunEvent::SubmitFailed { .. } => "submit_failed",
            RunEvent::JobUpdated { .. } => "job_updated",
            RunEvent::DeadlineExceeded => "deadline_exceeded",
            RunEvent::JobLost => "job_lost",
            RunEvent::ClusterHeartbeat { .. } => "cluster_heartbeat",
            RunEvent::ClusterLost => "cluster_lost",
            RunEvent::BackoffElapsed => "backoff_elapsed",
            RunEvent::BisectConcluded { .. } => "bisect_concluded",
            RunEvent::Cancel => "cancel",
            RunEvent::Reported => "reported",
        }
    }
}

/// One test run at one revision
#[derive(Debug, Clone)]
pub struct Run {
    pub id: RunId,
    /// Resolved spec (smoke overrides already applied)
    pub spec: TestSpec,
    pub revision: Option<Revision>,
    pub state: RunState,
    pub cluster: Option<ClusterHandle>,
    pub job: Option<JobHandle>,
    pub policy: RetryPolicy,
    /// Whether a failure goes to the bisection engine
    pub bisect: bool,
    pub retries_used: u32,
    pub cluster_attempts: u32,
    pub outcome: Option<Outcome>,
    /// Orchestrator-side explanation for a non-success outcome
    pub detail: Option<String>,
    pub bisect_report: Option<BisectReport>,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl Run {
    /// Create a run in the Pending state
    pub fn new(
        id: RunId,
        spec: TestSpec,
        revision: Option<Revision>,
        policy: RetryPolicy,
        clock: &impl Clock,
    ) -> Self {
        Run {
            id,
            spec,
            revision,
            state: RunState::Pending,
            cluster: None,
            job: None,
            policy,
            bisect: false,
            retries_used: 0,
            cluster_attempts: 0,
            outcome: None,
            detail: None,
            bisect_report: None,
            created_at: clock.now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Send failures to the bisection engine
    pub fn with_bisect(mut self, bisect: bool) -> Self {
        self.bisect = bisect;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the run still holds a cluster it has not asked to release
    pub fn holds_cluster(&self) -> bool {
        self.cluster.as_ref().is_some_and(|c| {
            !c.is_terminal() && c.status != ClusterStatus::Terminating
        })
    }

    pub fn job_status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|j| j.status)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.job.as_ref().and_then(|j| j.exit_code)
    }

    /// Wall time from start to finish, or to `now` while running
    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        self.finished_at.unwrap_or(now).saturating_duration_since(started)
    }

    pub fn cluster_request(&self, attempt: u32) -> ClusterRequest {
        ClusterRequest {
            name: format!("{}-{}-{}", self.spec.name, self.id, attempt),
            shape: self.spec.cluster.clone(),
        }
    }

    pub fn job_request(&self) -> JobRequest {
        JobRequest::for_spec(&self.id, &self.spec, self.revision.as_ref())
    }

    /// Pure transition function - returns new state and effects
    pub fn transition(&self, event: RunEvent, clock: &impl Clock) -> (Run, Vec<Effect>) {
        let now = clock.now();
        let mut next = self.clone();
        let mut effects = Vec::new();

        match (self.state, event) {
            // Pending → ClusterStarting
            (RunState::Pending, RunEvent::Start) => {
                next.started_at = Some(now);
                next.cluster_attempts = 1;
                next.state = RunState::ClusterStarting { attempt: 1 };
                effects.push(Effect::Emit(Event::RunStarted {
                    run_id: self.id.clone(),
                    test: self.spec.name.clone(),
                }));
                effects.push(Effect::AcquireCluster {
                    request: self.cluster_request(1),
                });
            }

            // ClusterStarting → ClusterReady
            (RunState::ClusterStarting { .. }, RunEvent::ClusterAcquired { cluster }) => {
                if !cluster.is_ready() {
                    // Handed over, so released even when it never came up
                    let cause = format!("cluster {} came back {}", cluster.id, cluster.status);
                    effects.push(Effect::ReleaseCluster {
                        cluster: cluster.clone(),
                    });
                    next.cluster = Some(cluster.transition(ClusterStatus::Terminating, clock));
                    if next.schedule_retry(&cause, &mut effects) {
                        next.cluster_attempts += 1;
                        next.state = RunState::ClusterStarting {
                            attempt: next.cluster_attempts,
                        };
                    } else {
                        next.detail = Some(cause);
                        next.finish(
                            Outcome::Errored(ErrorKind::ClusterProvisionFailed),
                            &mut effects,
                            now,
                        );
                    }
                } else {
                    next.cluster = Some(cluster.clone());
                    next.state = RunState::ClusterReady;
                    effects.push(Effect::Emit(Event::ClusterReady {
                        run_id: self.id.clone(),
                        cluster_id: cluster.id.clone(),
                    }));
                    effects.push(Effect::SubmitJob {
                        request: self.job_request(),
                        cluster,
                    });
                }
            }

            (RunState::ClusterStarting { .. }, RunEvent::ClusterFailed { retryable, cause }) => {
                if retryable && next.schedule_retry(&cause, &mut effects) {
                    next.cluster_attempts += 1;
                    next.state = RunState::ClusterStarting {
                        attempt: next.cluster_attempts,
                    };
                } else {
                    next.detail = Some(cause);
                    next.finish(
                        Outcome::Errored(ErrorKind::ClusterProvisionFailed),
                        &mut effects,
                        now,
                    );
                }
            }

            // ClusterStarting → Errored on provisioning timeout
            (RunState::ClusterStarting { attempt }, RunEvent::ProvisionTimedOut) => {
                effects.push(Effect::AbandonCluster {
                    request: self.cluster_request(attempt),
                });
                next.detail = Some("cluster was not ready within the provisioning timeout".into());
                next.finish(
                    Outcome::Errored(ErrorKind::ClusterProvisionTimeout),
                    &mut effects,
                    now,
                );
            }

            (RunState::ClusterStarting { attempt }, RunEvent::BackoffElapsed) => {
                effects.push(Effect::AcquireCluster {
                    request: self.cluster_request(attempt),
                });
            }

            // ClusterReady: resubmit after a backoff
            (RunState::ClusterReady, RunEvent::BackoffElapsed) => {
                if let Some(cluster) = self.cluster.clone() {
                    effects.push(Effect::SubmitJob {
                        cluster,
                        request: self.job_request(),
                    });
                }
            }

            // ClusterReady → JobRunning
            (RunState::ClusterReady, RunEvent::JobSubmitted { job }) => {
                next.job = Some(job.clone());
                next.state = RunState::JobRunning;
                effects.push(Effect::Emit(Event::JobStarted {
                    run_id: self.id.clone(),
                    job_id: job.id.clone(),
                }));
                effects.push(Effect::WatchJob {
                    job,
                    timeout: self.spec.timeout,
                });
            }

            (RunState::ClusterReady, RunEvent::SubmitFailed { retryable, cause }) => {
                if !(retryable && next.schedule_retry(&cause, &mut effects)) {
                    next.release_cluster(&mut effects, clock);
                    next.detail = Some(cause);
                    next.finish(
                        Outcome::Errored(ErrorKind::JobSubmissionFailed),
                        &mut effects,
                        now,
                    );
                }
            }

            // JobRunning: fold status reports
            (RunState::JobRunning, RunEvent::JobUpdated { report }) => {
                let Some(job) = self.job.as_ref().map(|j| j.apply(report, clock)) else {
                    return (self.clone(), vec![]);
                };
                let status = job.status;
                let exit_code = job.exit_code;
                next.job = Some(job);
                match status {
                    JobStatus::Submitted | JobStatus::Running => {}
                    JobStatus::Succeeded => {
                        next.release_cluster(&mut effects, clock);
                        next.state = RunState::Succeeded;
                        next.finish(Outcome::Succeeded, &mut effects, now);
                    }
                    JobStatus::Failed | JobStatus::Cancelled => {
                        let reason = match exit_code {
                            Some(code) => format!("job failed with exit code {code}"),
                            None => format!("job ended {status}"),
                        };
                        if self.spec.retry_on_failure && next.schedule_retry(&reason, &mut effects)
                        {
                            next.state = RunState::ClusterReady;
                        } else {
                            if status == JobStatus::Cancelled {
                                next.detail = Some("job was cancelled by the job platform".into());
                            }
                            next.conclude(Outcome::Failed, &mut effects, now, clock);
                        }
                    }
                    JobStatus::Timeout => {
                        next.conclude(Outcome::TimedOut, &mut effects, now, clock);
                    }
                }
            }

            // JobRunning → TimedOut; the job is cancelled
            (RunState::JobRunning, RunEvent::DeadlineExceeded) => {
                next.cancel_job(JobStatus::Timeout, &mut effects, clock);
                next.conclude(Outcome::TimedOut, &mut effects, now, clock);
            }

            (RunState::JobRunning, RunEvent::JobLost) => {
                next.cancel_job(JobStatus::Cancelled, &mut effects, clock);
                let reason = "job reported no status within the submission grace period";
                if next.schedule_retry(reason, &mut effects) {
                    next.state = RunState::ClusterReady;
                } else {
                    next.release_cluster(&mut effects, clock);
                    next.detail = Some(reason.into());
                    next.finish(
                        Outcome::Errored(ErrorKind::JobSubmissionLost),
                        &mut effects,
                        now,
                    );
                }
            }

            (RunState::JobRunning, RunEvent::ClusterHeartbeat { at }) => {
                next.cluster = self.cluster.as_ref().map(|c| c.heartbeat(at));
            }

            // JobRunning: cluster died; start over on a fresh cluster if budget remains
            (RunState::JobRunning, RunEvent::ClusterLost) => {
                next.cancel_job(JobStatus::Cancelled, &mut effects, clock);
                next.release_cluster(&mut effects, clock);
                let reason = "cluster stopped answering heartbeats";
                if next.schedule_retry(reason, &mut effects) {
                    next.job = None;
                    next.cluster_attempts += 1;
                    next.state = RunState::ClusterStarting {
                        attempt: next.cluster_attempts,
                    };
                } else {
                    next.detail = Some(reason.into());
                    next.finish(Outcome::Errored(ErrorKind::ClusterLost), &mut effects, now);
                }
            }

            // Bisecting → Reported or Errored
            (RunState::Bisecting, RunEvent::BisectConcluded { report }) => {
                let culprit = report.culprit.clone();
                let reason = report.inconclusive_reason.clone();
                next.bisect_report = Some(report);
                match (culprit, self.outcome) {
                    (Some(_), Some(outcome)) => {
                        next.state = RunState::Reported;
                        next.finish(outcome, &mut effects, now);
                    }
                    _ => {
                        if let Some(reason) = reason {
                            next.detail = Some(format!("bisection inconclusive: {reason}"));
                        }
                        next.finish(
                            Outcome::Errored(ErrorKind::BisectInconclusive),
                            &mut effects,
                            now,
                        );
                    }
                }
            }

            (RunState::Succeeded | RunState::Failed | RunState::TimedOut, RunEvent::Reported) => {
                next.state = RunState::Reported;
            }

            // Operator abort from any state that has not yet settled its outcome
            (
                RunState::Pending
                | RunState::ClusterStarting { .. }
                | RunState::ClusterReady
                | RunState::JobRunning
                | RunState::Bisecting,
                RunEvent::Cancel,
            ) => {
                if let RunState::ClusterStarting { attempt } = self.state {
                    effects.push(Effect::AbandonCluster {
                        request: self.cluster_request(attempt),
                    });
                }
                next.cancel_job(JobStatus::Cancelled, &mut effects, clock);
                next.release_cluster(&mut effects, clock);
                next.detail = Some("run cancelled".into());
                next.finish(Outcome::Errored(ErrorKind::Cancelled), &mut effects, now);
            }

            // Invalid transitions - no change
            (state, event) => {
                tracing::debug!(run_id = %self.id, %state, event = event.name(), "ignoring run event");
                return (self.clone(), vec![]);
            }
        }

        if next.state != self.state {
            tracing::debug!(run_id = %self.id, from = %self.state, to = %next.state, "run transition");
        }
        (next, effects)
    }

    /// Consume one retry if the budget allows, requesting a backoff
    fn schedule_retry(&mut self, reason: &str, effects: &mut Vec<Effect>) -> bool {
        if !self.policy.allows(self.retries_used) {
            return false;
        }
        let delay = self.policy.delay(self.retries_used);
        self.retries_used += 1;
        effects.push(Effect::Emit(Event::RunRetrying {
            run_id: self.id.clone(),
            retry: self.retries_used,
            reason: reason.to_string(),
        }));
        effects.push(Effect::Backoff { delay });
        true
    }

    /// Request cancellation of a live job, recording it as ended with `status`
    fn cancel_job(&mut self, status: JobStatus, effects: &mut Vec<Effect>, clock: &impl Clock) {
        let Some(job) = self.job.as_ref().filter(|j| !j.is_terminal()) else {
            return;
        };
        effects.push(Effect::CancelJob { job: job.clone() });
        self.job = Some(job.apply(JobReport::new(status), clock));
    }

    fn release_cluster(&mut self, effects: &mut Vec<Effect>, clock: &impl Clock) {
        if !self.holds_cluster() {
            return;
        }
        if let Some(cluster) = self.cluster.take() {
            effects.push(Effect::ReleaseCluster {
                cluster: cluster.clone(),
            });
            self.cluster = Some(cluster.transition(ClusterStatus::Terminating, clock));
        }
    }

    /// Settle a test verdict: release, then bisect or report
    fn conclude(
        &mut self,
        outcome: Outcome,
        effects: &mut Vec<Effect>,
        now: Instant,
        clock: &impl Clock,
    ) {
        self.release_cluster(effects, clock);
        if self.bisect {
            self.outcome = Some(outcome);
            self.state = RunState::Bisecting;
            effects.push(Effect::Emit(Event::BisectStarted {
                run_id: self.id.clone(),
            }));
            effects.push(Effect::StartBisect);
            return;
        }
        self.state = match outcome {
            Outcome::TimedOut => RunState::TimedOut,
            _ => RunState::Failed,
        };
        self.finish(outcome, effects, now);
    }

    /// Fix the outcome and request the report
    fn finish(&mut self, outcome: Outcome, effects: &mut Vec<Effect>, now: Instant) {
        if let Outcome::Errored(kind) = outcome {
            self.state = RunState::Errored(kind);
        }
        self.outcome = Some(outcome);
        self.finished_at = Some(now);
        effects.push(Effect::Emit(Event::RunFinished {
            run_id: self.id.clone(),
            outcome,
        }));
        effects.push(Effect::Report { outcome });
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
