// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job output records

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a line of job output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Lines produced by the job platform rather than the workload
    System,
}

/// One line of job output. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Offset from job submission
    #[serde(with = "humantime_serde")]
    pub at: Duration,
    pub source: LogSource,
    pub line: String,
}

impl LogRecord {
    pub fn new(at: Duration, source: LogSource, line: impl Into<String>) -> Self {
        Self {
            at,
            source,
            line: line.into(),
        }
    }

    pub fn stdout(at: Duration, line: impl Into<String>) -> Self {
        Self::new(at, LogSource::Stdout, line)
    }

    pub fn stderr(at: Duration, line: impl Into<String>) -> Self {
        Self::new(at, LogSource::Stderr, line)
    }
}
