// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry budget and exponential backoff

use crate::config::BackoffConfig;
use std::time::Duration;

/// How many transient failures a run may absorb, and how long to wait between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub budget: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(budget: u32, backoff: &BackoffConfig) -> Self {
        Self {
            budget,
            base: backoff.base,
            max: backoff.max,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            budget: 0,
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Whether another retry fits after `used` retries
    pub fn allows(&self, used: u32) -> bool {
        used < self.budget
    }

    /// Delay before retry number `used + 1`: `base * 2^used`, capped at `max`
    pub fn delay(&self, used: u32) -> Duration {
        let factor = 1u32.checked_shl(used).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
