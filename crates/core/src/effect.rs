// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for run orchestration

use crate::cluster::{ClusterHandle, ClusterId, ClusterRequest};
use crate::id::RunId;
use crate::job::{JobHandle, JobId, JobRequest};
use crate::outcome::Outcome;
use crate::traced::TracedEffect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Side effects the run state machine asks the engine to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for observers
    Emit(Event),
    /// Ask the cluster manager for a cluster; answered with an acquire event
    AcquireCluster { request: ClusterRequest },
    /// Tear down a cluster whose acquisition was abandoned before it was ready
    AbandonCluster { request: ClusterRequest },
    /// Tear down an acquired cluster
    ReleaseCluster { cluster: ClusterHandle },
    /// Submit the test's workload to a ready cluster
    SubmitJob {
        cluster: ClusterHandle,
        request: JobRequest,
    },
    /// Watch a submitted job until it ends or its deadline passes
    WatchJob { job: JobHandle, timeout: Duration },
    /// Best-effort cancellation of a job
    CancelJob { job: JobHandle },
    /// Wait before the next attempt
    Backoff { delay: Duration },
    /// Hand the failing run to the bisection engine
    StartBisect,
    /// Freeze and publish the run's result
    Report { outcome: Outcome },
}

impl TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Emit(_) => "emit",
            Effect::AcquireCluster { .. } => "acquire_cluster",
            Effect::AbandonCluster { .. } => "abandon_cluster",
            Effect::ReleaseCluster { .. } => "release_cluster",
            Effect::SubmitJob { .. } => "submit_job",
            Effect::WatchJob { .. } => "watch_job",
            Effect::CancelJob { .. } => "cancel_job",
            Effect::Backoff { .. } => "backoff",
            Effect::StartBisect => "start_bisect",
            Effect::Report { .. } => "report",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit(event) => vec![("event", event.name().to_string())],
            Effect::AcquireCluster { request } | Effect::AbandonCluster { request } => vec![
                ("cluster", request.name.clone()),
                ("nodes", request.shape.node_count.to_string()),
            ],
            Effect::ReleaseCluster { cluster } => vec![("cluster_id", cluster.id.to_string())],
            Effect::SubmitJob { cluster, request } => vec![
                ("cluster_id", cluster.id.to_string()),
                ("job", request.name.clone()),
            ],
            Effect::WatchJob { job, timeout } => vec![
                ("job_id", job.id.to_string()),
                ("timeout", format!("{timeout:?}")),
            ],
            Effect::CancelJob { job } => vec![("job_id", job.id.to_string())],
            Effect::Backoff { delay } => vec![("delay", format!("{delay:?}"))],
            Effect::StartBisect => vec![],
            Effect::Report { outcome } => vec![("outcome", outcome.to_string())],
        }
    }
}

/// Events emitted by runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RunStarted {
        run_id: RunId,
        test: String,
    },
    ClusterReady {
        run_id: RunId,
        cluster_id: ClusterId,
    },
    JobStarted {
        run_id: RunId,
        job_id: JobId,
    },
    RunRetrying {
        run_id: RunId,
        retry: u32,
        reason: String,
    },
    BisectStarted {
        run_id: RunId,
    },
    RunFinished {
        run_id: RunId,
        outcome: Outcome,
    },
}

impl Event {
    /// Event name in "category:action" form
    pub fn name(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run:started",
            Event::ClusterReady { .. } => "cluster:ready",
            Event::JobStarted { .. } => "job:started",
            Event::RunRetrying { .. } => "run:retrying",
            Event::BisectStarted { .. } => "bisect:started",
            Event::RunFinished { .. } => "run:finished",
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::ClusterReady { run_id, .. }
            | Event::JobStarted { run_id, .. }
            | Event::RunRetrying { run_id, .. }
            | Event::BisectStarted { run_id }
            | Event::RunFinished { run_id, .. } => run_id,
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
