// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job manager adapters

mod local;

pub use local::LocalJobAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobAdapter, FakeJobScript, JobCall};

use async_trait::async_trait;
use rt_core::{ClusterHandle, JobHandle, JobId, JobReport, JobRequest, LogRecord};
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Lazy, finite stream of a job's output, oldest line first
pub type LogStream = Pin<Box<dyn Stream<Item = LogRecord> + Send>>;

/// Errors from job operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job submission rejected: {cause}")]
    Rejected { retryable: bool, cause: String },
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job platform error: {0}")]
    Platform(String),
}

impl JobError {
    /// Whether submitting again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Rejected { retryable, .. } => *retryable,
            JobError::NotFound(_) => false,
            JobError::Platform(_) => true,
        }
    }
}

/// Adapter for remote job execution
#[async_trait]
pub trait JobAdapter: Clone + Send + Sync + 'static {
    /// Launch the workload on a ready cluster
    async fn submit(
        &self,
        cluster: &ClusterHandle,
        request: &JobRequest,
    ) -> Result<JobHandle, JobError>;

    /// Current status without blocking. `None` until the platform has
    /// reported anything for the job.
    async fn poll(&self, job: &JobHandle) -> Result<Option<JobReport>, JobError>;

    /// Output so far and as it arrives. Every call starts from the first line.
    fn stream_logs(&self, job: &JobHandle) -> LogStream;

    /// Best-effort stop. Cancelling a finished job succeeds.
    async fn cancel(&self, job: &JobHandle) -> Result<(), JobError>;
}
