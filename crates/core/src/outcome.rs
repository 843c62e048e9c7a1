// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run outcomes, error taxonomy and process exit codes
//!
//! Exit codes keep "the product regressed" apart from "the harness broke":
//! test failures live in the 40s, infrastructure errors in the 30s.

use serde::{Deserialize, Serialize};

/// Why a run ended in the errored state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed test spec or configuration
    Config,
    /// Cluster provider refused or failed the request
    ClusterProvisionFailed,
    /// Cluster did not become ready in time
    ClusterProvisionTimeout,
    /// Heartbeat found the cluster dead mid-run
    ClusterLost,
    /// Job platform rejected or could not accept the job
    JobSubmissionFailed,
    /// Job never reported a status after submission
    JobSubmissionLost,
    /// Bisection ended without a definitive boundary
    BisectInconclusive,
    /// Operator abort
    Cancelled,
    /// The engine lost the run task before it reported
    Internal,
}

/// Coarse classification of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Infrastructure,
    Timeout,
    TestFailure,
    BisectInconclusive,
    Config,
}

impl ErrorKind {
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::Config => ErrorClass::Config,
            ErrorKind::ClusterProvisionTimeout => ErrorClass::Timeout,
            ErrorKind::BisectInconclusive => ErrorClass::BisectInconclusive,
            ErrorKind::ClusterProvisionFailed
            | ErrorKind::ClusterLost
            | ErrorKind::JobSubmissionFailed
            | ErrorKind::JobSubmissionLost
            | ErrorKind::Cancelled
            | ErrorKind::Internal => ErrorClass::Infrastructure,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Config => "config error",
            ErrorKind::ClusterProvisionFailed => "cluster provisioning failed",
            ErrorKind::ClusterProvisionTimeout => "cluster provisioning timed out",
            ErrorKind::ClusterLost => "cluster lost",
            ErrorKind::JobSubmissionFailed => "job submission failed",
            ErrorKind::JobSubmissionLost => "job submission lost",
            ErrorKind::BisectInconclusive => "bisection inconclusive",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "kind")]
pub enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
    Errored(ErrorKind),
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Succeeded
    }

    /// Error class, or `None` for a successful run
    pub fn class(self) -> Option<ErrorClass> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Failed => Some(ErrorClass::TestFailure),
            Outcome::TimedOut => Some(ErrorClass::Timeout),
            Outcome::Errored(kind) => Some(kind.class()),
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Succeeded => ExitCode::Success,
            Outcome::Failed => ExitCode::TestFailure,
            Outcome::TimedOut => ExitCode::TestTimeout,
            Outcome::Errored(kind) => match kind {
                ErrorKind::Config => ExitCode::ConfigError,
                ErrorKind::ClusterProvisionFailed => ExitCode::ClusterStartupError,
                ErrorKind::ClusterProvisionTimeout => ExitCode::ClusterStartupTimeout,
                ErrorKind::ClusterLost
                | ErrorKind::JobSubmissionFailed
                | ErrorKind::JobSubmissionLost => ExitCode::JobPlatformError,
                ErrorKind::BisectInconclusive => ExitCode::BisectInconclusive,
                ErrorKind::Cancelled => ExitCode::Cancelled,
                ErrorKind::Internal => ExitCode::InternalError,
            },
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => f.write_str("succeeded"),
            Outcome::Failed => f.write_str("failed"),
            Outcome::TimedOut => f.write_str("timed out"),
            Outcome::Errored(kind) => write!(f, "errored ({kind})"),
        }
    }
}

/// Process exit codes consumed by the CI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    InternalError = 1,
    Cancelled = 2,
    BisectInconclusive = 3,
    ConfigError = 10,
    ClusterStartupError = 33,
    ClusterStartupTimeout = 34,
    JobPlatformError = 39,
    TestFailure = 40,
    TestTimeout = 42,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the code signals a broken harness rather than a broken product
    pub fn is_infrastructure(self) -> bool {
        matches!(
            self,
            ExitCode::InternalError
                | ExitCode::ClusterStartupError
                | ExitCode::ClusterStartupTimeout
                | ExitCode::JobPlatformError
        )
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
