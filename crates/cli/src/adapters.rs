// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime factory for CLI commands

use anyhow::Result;
use rt_adapters::{LocalClusterAdapter, LocalJobAdapter, TracedClusterAdapter, TracedJobAdapter};
use rt_core::{EngineConfig, SystemClock, UuidIdGen};
use rt_engine::{CancelToken, Runtime, RuntimeDeps};
use std::path::PathBuf;

/// Runtime backed by local processes
pub type LocalRuntime = Runtime<
    TracedClusterAdapter<LocalClusterAdapter>,
    TracedJobAdapter<LocalJobAdapter>,
    SystemClock,
    UuidIdGen,
>;

/// Create a runtime with the local backend
pub fn make_runtime(config: EngineConfig) -> Result<LocalRuntime> {
    let root = work_root(&config);
    tracing::debug!(root = %root.display(), "local cluster root");

    let deps = RuntimeDeps {
        clusters: TracedClusterAdapter::new(LocalClusterAdapter::new(root)),
        jobs: TracedJobAdapter::new(LocalJobAdapter::new()),
    };
    Ok(Runtime::new(deps, config, SystemClock, UuidIdGen)?)
}

fn work_root(config: &EngineConfig) -> PathBuf {
    config
        .local
        .work_root
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("rt-clusters"))
}

/// Cancel token tripped by Ctrl-C
pub fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nCancelling, cleaning up clusters...");
                token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });
    cancel
}
