// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use rt_core::ConfigError;
use thiserror::Error;

/// Errors that can occur in the runtime
///
/// Test and infrastructure failures are not errors here; they end a run in
/// a terminal state and come back as a `RunResult`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("run cancelled")]
    Cancelled,
    #[error("resource class {0} is closed")]
    SchedulerClosed(String),
}
