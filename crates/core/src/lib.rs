// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rt-core: Core library for the release test orchestrator
//!
//! This crate provides:
//! - The data model: test specs, cluster and job handles, log records, results
//! - The pure run state machine and its effects
//! - Bisection search state and probe voting
//! - The log aggregator, retry policy and exit-code taxonomy
//! - Engine configuration, clock and id injection

pub mod clock;
pub mod id;

pub mod config;
pub mod spec;
pub mod traced;

// Data model
pub mod cluster;
pub mod job;
pub mod log;
pub mod outcome;
pub mod result;

// Pure machinery (order matters for dependencies)
pub mod aggregate;
pub mod bisect;
pub mod effect;
pub mod retry;
pub mod run;

// Re-exports
pub use aggregate::{LogAggregator, LogPatterns, LogSummary};
pub use bisect::{
    BisectRange, BisectReport, BisectStep, ProbeRecord, ProbeSummary, ProbeTally, Verdict,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use cluster::{ClusterHandle, ClusterId, ClusterRequest, ClusterStatus};
pub use config::{BackoffConfig, BisectConfig, EngineConfig, LocalConfig, LogConfig};
pub use effect::{Effect, Event};
pub use id::{IdGen, RunId, SequentialIdGen, UuidIdGen};
pub use job::{JobHandle, JobId, JobReport, JobRequest, JobStatus};
pub use log::{LogRecord, LogSource};
pub use outcome::{ErrorClass, ErrorKind, ExitCode, Outcome};
pub use result::{ResultParts, RunResult};
pub use retry::RetryPolicy;
pub use run::{Run, RunEvent, RunState};
pub use spec::{ClusterShape, ConfigError, Revision, SmokeOverrides, TestSpec};
pub use traced::TracedEffect;
