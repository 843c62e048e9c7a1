// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local cluster adapter
//!
//! A "cluster" is a scratch directory under a root. Jobs submitted through
//! the local job adapter run with it as their working directory.

use super::{ClusterAdapter, ClusterError, ProvisionError};
use async_trait::async_trait;
use rt_core::{ClusterHandle, ClusterRequest, ClusterStatus, SystemClock};
use std::path::{Path, PathBuf};

/// Directory-backed cluster adapter
#[derive(Clone)]
pub struct LocalClusterAdapter {
    root: PathBuf,
}

impl LocalClusterAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, name: &str) -> PathBuf {
        self.root.join(dir_name(name))
    }
}

/// Map a cluster name onto a safe directory name
fn dir_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

async fn remove_dir(dir: &Path) -> Result<(), ClusterError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ClusterError::TeardownFailed(format!(
            "{}: {}",
            dir.display(),
            e
        ))),
    }
}

#[async_trait]
impl ClusterAdapter for LocalClusterAdapter {
    async fn acquire(&self, request: &ClusterRequest) -> Result<ClusterHandle, ProvisionError> {
        if request.shape.node_count == 0 {
            return Err(ProvisionError::fatal("cluster shape has no nodes"));
        }
        let dir = self.dir_for(&request.name);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            ProvisionError::transient(format!("create {}: {}", dir.display(), e))
        })?;

        let clock = SystemClock;
        let handle = ClusterHandle::new(request.name.clone(), request.shape.clone(), &clock)
            .with_workdir(dir)
            .transition(ClusterStatus::Provisioning, &clock)
            .transition(ClusterStatus::Ready, &clock);
        Ok(handle)
    }

    async fn release(&self, cluster: &ClusterHandle) -> Result<(), ClusterError> {
        let dir = cluster
            .workdir
            .clone()
            .unwrap_or_else(|| self.dir_for(&cluster.id.0));
        remove_dir(&dir).await
    }

    async fn abandon(&self, request: &ClusterRequest) -> Result<(), ClusterError> {
        remove_dir(&self.dir_for(&request.name)).await
    }

    async fn heartbeat(&self, cluster: &ClusterHandle) -> bool {
        let Some(dir) = cluster.workdir.as_ref() else {
            return false;
        };
        tokio::fs::try_exists(dir).await.unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
