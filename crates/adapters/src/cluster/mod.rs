// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster manager adapters

mod local;

pub use local::LocalClusterAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClusterCall, FakeClusterAdapter};

use async_trait::async_trait;
use rt_core::{ClusterHandle, ClusterRequest};
use thiserror::Error;

/// Provisioning failure reported by a cluster provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cluster provisioning failed: {cause}")]
pub struct ProvisionError {
    /// Whether asking again may succeed (capacity, throttling)
    pub retryable: bool,
    pub cause: String,
}

impl ProvisionError {
    pub fn transient(cause: impl Into<String>) -> Self {
        Self {
            retryable: true,
            cause: cause.into(),
        }
    }

    pub fn fatal(cause: impl Into<String>) -> Self {
        Self {
            retryable: false,
            cause: cause.into(),
        }
    }
}

/// Errors from cluster teardown
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster teardown failed: {0}")]
    TeardownFailed(String),
}

/// Adapter for ephemeral cluster provisioning
#[async_trait]
pub trait ClusterAdapter: Clone + Send + Sync + 'static {
    /// Provision a cluster and suspend until it is ready
    async fn acquire(&self, request: &ClusterRequest) -> Result<ClusterHandle, ProvisionError>;

    /// Tear down a cluster. Releasing an already-terminated cluster succeeds.
    async fn release(&self, cluster: &ClusterHandle) -> Result<(), ClusterError>;

    /// Tear down whatever an abandoned acquisition may have left behind
    async fn abandon(&self, request: &ClusterRequest) -> Result<(), ClusterError>;

    /// Liveness probe
    async fn heartbeat(&self, cluster: &ClusterHandle) -> bool;
}
