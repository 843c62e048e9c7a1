// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::cluster::{ClusterAdapter, ClusterError, ProvisionError};
use crate::job::{JobAdapter, JobError, LogStream};
use async_trait::async_trait;
use rt_core::{ClusterHandle, ClusterRequest, JobHandle, JobReport, JobRequest};
use tracing::Instrument;

/// Wrapper that adds tracing to any ClusterAdapter
#[derive(Clone)]
pub struct TracedClusterAdapter<C> {
    inner: C,
}

impl<C> TracedClusterAdapter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ClusterAdapter> ClusterAdapter for TracedClusterAdapter<C> {
    async fn acquire(&self, request: &ClusterRequest) -> Result<ClusterHandle, ProvisionError> {
        let span = tracing::info_span!("cluster.acquire", name = %request.name);
        async {
            tracing::info!(
                nodes = request.shape.node_count,
                instance_types = ?request.shape.instance_types,
                "starting"
            );

            // Precondition: a cluster needs at least one node
            if request.shape.node_count == 0 {
                tracing::error!("cluster shape has no nodes");
                return Err(ProvisionError::fatal("cluster shape has no nodes"));
            }

            let start = std::time::Instant::now();
            let result = self.inner.acquire(request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(cluster) => tracing::info!(
                    cluster_id = %cluster.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "cluster ready"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    retryable = e.retryable,
                    error = %e,
                    "acquire failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn release(&self, cluster: &ClusterHandle) -> Result<(), ClusterError> {
        let span = tracing::info_span!("cluster.release", cluster_id = %cluster.id);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.release(cluster).await;
            // release() failing never blocks reporting
            match &result {
                Ok(()) => tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "released"
                ),
                Err(e) => tracing::warn!(error = %e, "release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn abandon(&self, request: &ClusterRequest) -> Result<(), ClusterError> {
        let span = tracing::info_span!("cluster.abandon", name = %request.name);
        async {
            let result = self.inner.abandon(request).await;
            match &result {
                Ok(()) => tracing::info!("abandoned"),
                Err(e) => tracing::warn!(error = %e, "abandon failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn heartbeat(&self, cluster: &ClusterHandle) -> bool {
        let alive = self.inner.heartbeat(cluster).await;
        tracing::trace!(cluster_id = %cluster.id, alive, "heartbeat");
        alive
    }
}

/// Wrapper that adds tracing to any JobAdapter
#[derive(Clone)]
pub struct TracedJobAdapter<J> {
    inner: J,
}

impl<J> TracedJobAdapter<J> {
    pub fn new(inner: J) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<J: JobAdapter> JobAdapter for TracedJobAdapter<J> {
    async fn submit(
        &self,
        cluster: &ClusterHandle,
        request: &JobRequest,
    ) -> Result<JobHandle, JobError> {
        let span = tracing::info_span!("job.submit", job = %request.name, cluster_id = %cluster.id);
        async {
            tracing::info!(
                command = %request.command,
                env_count = request.env.len(),
                revision = ?request.revision.as_ref().map(|r| r.0.as_str()),
                "starting"
            );

            // Precondition: jobs only go to ready clusters
            if !cluster.is_ready() {
                tracing::error!(status = %cluster.status, "cluster is not ready");
                return Err(JobError::Rejected {
                    retryable: false,
                    cause: format!("cluster {} is not ready ({})", cluster.id, cluster.status),
                });
            }

            let start = std::time::Instant::now();
            let result = self.inner.submit(cluster, request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(job) => tracing::info!(
                    job_id = %job.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "job submitted"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "submit failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn poll(&self, job: &JobHandle) -> Result<Option<JobReport>, JobError> {
        let result = self.inner.poll(job).await;
        tracing::trace!(
            job_id = %job.id,
            status = ?result.as_ref().ok().and_then(|r| r.map(|r| r.status)),
            "polled"
        );
        result
    }

    fn stream_logs(&self, job: &JobHandle) -> LogStream {
        tracing::debug!(job_id = %job.id, "streaming logs");
        self.inner.stream_logs(job)
    }

    async fn cancel(&self, job: &JobHandle) -> Result<(), JobError> {
        let span = tracing::info_span!("job.cancel", job_id = %job.id);
        async {
            let result = self.inner.cancel(job).await;
            // cancel() failing is often acceptable (job already gone)
            match &result {
                Ok(()) => tracing::info!("cancelled"),
                Err(e) => tracing::warn!(error = %e, "cancel failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
