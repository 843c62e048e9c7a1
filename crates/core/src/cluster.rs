// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster handles
//!
//! A [`ClusterHandle`] is exclusively owned by the run that acquired it.
//! Status changes go through [`ClusterHandle::transition`], which refuses to
//! leave a terminal status.

use crate::clock::Clock;
use crate::spec::ClusterShape;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Unique identifier for a cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub String);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        ClusterId(s.to_string())
    }
}

/// Provisioning status of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Requested,
    Provisioning,
    Ready,
    Terminating,
    Terminated,
    Failed,
}

impl ClusterStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClusterStatus::Terminated | ClusterStatus::Failed)
    }

    fn can_become(self, next: ClusterStatus) -> bool {
        use ClusterStatus::*;
        match (self, next) {
            (Terminated | Failed, _) => false,
            (Requested, Provisioning | Ready | Terminating | Failed) => true,
            (Provisioning, Ready | Terminating | Failed) => true,
            (Ready, Terminating | Terminated | Failed) => true,
            (Terminating, Terminated | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClusterStatus::Requested => "requested",
            ClusterStatus::Provisioning => "provisioning",
            ClusterStatus::Ready => "ready",
            ClusterStatus::Terminating => "terminating",
            ClusterStatus::Terminated => "terminated",
            ClusterStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a run asks the cluster manager for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequest {
    /// Name for the cluster, unique per run attempt
    pub name: String,
    pub shape: ClusterShape,
}

/// Handle to one ephemeral cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub id: ClusterId,
    pub status: ClusterStatus,
    pub shape: ClusterShape,
    pub created_at: Instant,
    pub last_heartbeat: Option<Instant>,
    /// Working location on the cluster, when the backend has one
    pub workdir: Option<PathBuf>,
}

impl ClusterHandle {
    /// Create a handle for a cluster the provider has accepted
    pub fn new(id: impl Into<String>, shape: ClusterShape, clock: &impl Clock) -> Self {
        Self {
            id: ClusterId(id.into()),
            status: ClusterStatus::Requested,
            shape,
            created_at: clock.now(),
            last_heartbeat: None,
            workdir: None,
        }
    }

    pub fn with_workdir(mut self, workdir: PathBuf) -> Self {
        self.workdir = Some(workdir);
        self
    }

    /// Move to `next` if the move is legal; otherwise the handle is unchanged
    pub fn transition(&self, next: ClusterStatus, clock: &impl Clock) -> ClusterHandle {
        if !self.status.can_become(next) {
            tracing::debug!(cluster = %self.id, from = %self.status, to = %next, "ignoring cluster transition");
            return self.clone();
        }
        let last_heartbeat = if next == ClusterStatus::Ready {
            Some(clock.now())
        } else {
            self.last_heartbeat
        };
        ClusterHandle {
            status: next,
            last_heartbeat,
            ..self.clone()
        }
    }

    /// Record a liveness probe that succeeded at `at`; older probes are ignored
    pub fn heartbeat(&self, at: Instant) -> ClusterHandle {
        if self.status != ClusterStatus::Ready || self.last_heartbeat.is_some_and(|t| t >= at) {
            return self.clone();
        }
        ClusterHandle {
            last_heartbeat: Some(at),
            ..self.clone()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ClusterStatus::Ready
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
