// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) yields a usable configuration.

use crate::spec::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default pattern for metric lines: `METRIC name=value` or `METRIC name: value`
pub const DEFAULT_METRIC_PATTERN: &str =
    r"^\s*METRIC\s+(?P<name>[A-Za-z0-9_.:/-]+?)\s*[=:]\s*(?P<value>[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*$";

/// Default fatal-error markers
pub const DEFAULT_FATAL_MARKERS: &[&str] = &[
    r"Traceback \(most recent call last\)",
    r"^\s*(?:FATAL|panic)\b",
    r"\bOutOfMemoryError\b",
];

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a cluster may take to become ready
    #[serde(with = "humantime_serde")]
    pub provision_timeout: Duration,
    /// Interval between job status polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How long a submitted job may go without reporting any status
    #[serde(with = "humantime_serde")]
    pub submission_grace: Duration,
    /// Interval between cluster liveness probes while a job runs
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
    /// How long to keep reading logs after the job finished
    #[serde(with = "humantime_serde")]
    pub log_drain_timeout: Duration,
    pub backoff: BackoffConfig,
    pub bisect: BisectConfig,
    pub logs: LogConfig,
    /// Lease capacity per resource class; unlisted classes are exclusive
    pub resource_classes: BTreeMap<String, u32>,
    pub local: LocalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provision_timeout: Duration::from_secs(30 * 60),
            poll_interval: Duration::from_secs(10),
            submission_grace: Duration::from_secs(5 * 60),
            heartbeat_interval: Duration::from_secs(60),
            log_drain_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
            bisect: BisectConfig::default(),
            logs: LogConfig::default(),
            resource_classes: BTreeMap::new(),
            local: LocalConfig::default(),
        }
    }
}

/// Exponential backoff between retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(with = "humantime_serde")]
    pub base: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            max: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectConfig {
    /// Upper bound on probes before a bisection is declared inconclusive
    pub max_probes: u32,
}

impl Default for BisectConfig {
    fn default() -> Self {
        Self { max_probes: 32 }
    }
}

/// Patterns the log aggregator looks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Regex with `name` and `value` capture groups
    pub metric_pattern: String,
    pub fatal_markers: Vec<String>,
    /// Lines kept in the diagnostic tail
    pub tail_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            metric_pattern: DEFAULT_METRIC_PATTERN.to_string(),
            fatal_markers: DEFAULT_FATAL_MARKERS.iter().map(|s| s.to_string()).collect(),
            tail_lines: 100,
        }
    }
}

/// Settings for the local process backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Where cluster scratch directories are created; system temp dir if unset
    pub work_root: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("provision_timeout", self.provision_timeout),
            ("poll_interval", self.poll_interval),
            ("submission_grace", self.submission_grace),
            ("heartbeat_interval", self.heartbeat_interval),
            ("backoff.max", self.backoff.max),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::NotPositive(name));
            }
        }
        if self.bisect.max_probes == 0 {
            return Err(ConfigError::NotPositive("bisect.max_probes"));
        }
        if self.resource_classes.values().any(|&c| c == 0) {
            return Err(ConfigError::NotPositive("resource class capacity"));
        }
        crate::aggregate::LogPatterns::from_config(&self.logs)?;
        Ok(())
    }

    /// Lease capacity for a resource class
    pub fn class_capacity(&self, class: &str) -> u32 {
        self.resource_classes.get(class).copied().unwrap_or(1)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
