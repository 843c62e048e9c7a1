// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cluster adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClusterAdapter, ClusterError, ProvisionError};
use async_trait::async_trait;
use rt_core::{ClusterHandle, ClusterId, ClusterRequest, ClusterStatus, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Recorded cluster call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Acquire { name: String },
    Release { id: ClusterId },
    Abandon { name: String },
    Heartbeat { id: ClusterId },
}

#[derive(Default)]
struct FakeClusterState {
    ready_delay: Duration,
    failures: VecDeque<ProvisionError>,
    hang: bool,
    /// Lifetime of the next acquired cluster before heartbeats fail
    lose_next: VecDeque<Duration>,
    deaths: HashMap<ClusterId, Instant>,
    releases: HashMap<ClusterId, u32>,
    acquired: Vec<ClusterId>,
    next_id: u64,
}

/// Fake cluster adapter for testing.
///
/// Waits use tokio time, so tests on a paused runtime advance instantly.
#[derive(Clone, Default)]
pub struct FakeClusterAdapter {
    state: Arc<Mutex<FakeClusterState>>,
    calls: Arc<Mutex<Vec<ClusterCall>>>,
}

impl FakeClusterAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeClusterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Time each acquisition takes before the cluster is ready
    pub fn set_ready_delay(&self, delay: Duration) {
        self.state().ready_delay = delay;
    }

    /// Fail the next acquisition with `error`; queued failures are used in order
    pub fn fail_next(&self, error: ProvisionError) {
        self.state().failures.push_back(error);
    }

    /// Make acquisitions never complete
    pub fn set_hang(&self, hang: bool) {
        self.state().hang = hang;
    }

    /// The next acquired cluster stops answering heartbeats after `after`
    pub fn lose_next(&self, after: Duration) {
        self.state().lose_next.push_back(after);
    }

    /// Mark a cluster dead right now
    pub fn kill(&self, id: &ClusterId) {
        self.state().deaths.insert(id.clone(), Instant::now());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Clusters handed out so far, in order
    pub fn acquired(&self) -> Vec<ClusterId> {
        self.state().acquired.clone()
    }

    /// How often `release` was called for a cluster
    pub fn release_count(&self, id: &ClusterId) -> u32 {
        self.state().releases.get(id).copied().unwrap_or(0)
    }

    /// Acquired clusters that were never released
    pub fn leaked(&self) -> Vec<ClusterId> {
        let state = self.state();
        state
            .acquired
            .iter()
            .filter(|id| !state.releases.contains_key(*id))
            .cloned()
            .collect()
    }

    fn record(&self, call: ClusterCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl ClusterAdapter for FakeClusterAdapter {
    async fn acquire(&self, request: &ClusterRequest) -> Result<ClusterHandle, ProvisionError> {
        self.record(ClusterCall::Acquire {
            name: request.name.clone(),
        });

        let (failure, hang, delay) = {
            let mut state = self.state();
            (state.failures.pop_front(), state.hang, state.ready_delay)
        };
        if let Some(error) = failure {
            return Err(error);
        }
        if hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(delay).await;

        let clock = SystemClock;
        let mut state = self.state();
        state.next_id += 1;
        let id = ClusterId(format!("cluster-{}", state.next_id));
        if let Some(lifetime) = state.lose_next.pop_front() {
            state.deaths.insert(id.clone(), Instant::now() + lifetime);
        }
        state.acquired.push(id.clone());

        Ok(
            ClusterHandle::new(id.0, request.shape.clone(), &clock)
                .transition(ClusterStatus::Ready, &clock),
        )
    }

    async fn release(&self, cluster: &ClusterHandle) -> Result<(), ClusterError> {
        self.record(ClusterCall::Release {
            id: cluster.id.clone(),
        });
        *self.state().releases.entry(cluster.id.clone()).or_insert(0) += 1;
        Ok(())
    }

    async fn abandon(&self, request: &ClusterRequest) -> Result<(), ClusterError> {
        self.record(ClusterCall::Abandon {
            name: request.name.clone(),
        });
        Ok(())
    }

    async fn heartbeat(&self, cluster: &ClusterHandle) -> bool {
        self.record(ClusterCall::Heartbeat {
            id: cluster.id.clone(),
        });
        let state = self.state();
        if state.releases.contains_key(&cluster.id) {
            return false;
        }
        match state.deaths.get(&cluster.id) {
            Some(death) => Instant::now() < *death,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
