// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for clusters and job platforms

pub mod cluster;
pub mod job;
pub mod traced;

pub use cluster::{ClusterAdapter, ClusterError, LocalClusterAdapter, ProvisionError};
pub use job::{JobAdapter, JobError, LocalJobAdapter, LogStream};
pub use traced::{TracedClusterAdapter, TracedJobAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use cluster::{ClusterCall, FakeClusterAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use job::{FakeJobAdapter, FakeJobScript, JobCall};
