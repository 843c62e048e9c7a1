// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test specifications
//!
//! A [`TestSpec`] is the immutable description of one release test. It is
//! loaded and schema-checked upstream; this module only deserializes the
//! resolved form, validates it, and applies smoke-test overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable set on every smoke-test job
pub const SMOKE_TEST_ENV: &str = "IS_SMOKE_TEST";

/// A source revision under test
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Revision(s.to_string())
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Revision(s)
    }
}

/// Shape of the cluster a test needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterShape {
    /// Instance types, head node first
    pub instance_types: Vec<String>,
    /// Total node count including the head node
    pub node_count: u32,
}

impl ClusterShape {
    pub fn new(instance_type: impl Into<String>, node_count: u32) -> Self {
        Self {
            instance_types: vec![instance_type.into()],
            node_count,
        }
    }
}

/// Overrides applied when the smoke-test flag is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeOverrides {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Immutable description of a release test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    pub name: String,
    /// Shell entrypoint run on the cluster
    pub command: String,
    pub cluster: ClusterShape,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Retry budget for transient failures
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub smoke_test: bool,
    /// Also retry runs that failed on their own merits
    #[serde(default)]
    pub retry_on_failure: bool,
    /// Exclusive resource class this test leases while running
    #[serde(default)]
    pub resource_class: Option<String>,
    #[serde(default)]
    pub smoke: Option<SmokeOverrides>,
}

/// Errors in test specs or engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("cluster node count must be at least 1")]
    ZeroNodes,
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("invalid environment variable name: {0:?}")]
    InvalidEnvKey(String),
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid bisect range: {0}")]
    InvalidBisectRange(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl TestSpec {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        cluster: ClusterShape,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            cluster,
            env: BTreeMap::new(),
            timeout,
            retries: 0,
            smoke_test: false,
            retry_on_failure: false,
            resource_class: None,
            smoke: None,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_smoke_test(mut self, smoke_test: bool) -> Self {
        self.smoke_test = smoke_test;
        self
    }

    pub fn with_retry_on_failure(mut self, retry: bool) -> Self {
        self.retry_on_failure = retry;
        self
    }

    pub fn with_resource_class(mut self, class: impl Into<String>) -> Self {
        self.resource_class = Some(class.into());
        self
    }

    /// Parse a spec from TOML text
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and validate a spec file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = Self::from_toml(&text, path)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject malformed specs before any resource is requested
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyField("name"));
        }
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyField("command"));
        }
        if self.cluster.instance_types.is_empty()
            || self.cluster.instance_types.iter().any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::EmptyField("cluster.instance_types"));
        }
        if self.cluster.node_count == 0 {
            return Err(ConfigError::ZeroNodes);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::NotPositive("timeout"));
        }

        let smoke_env = self.smoke.iter().flat_map(|s| s.env.keys());
        for key in self.env.keys().chain(smoke_env) {
            if !is_valid_env_key(key) {
                return Err(ConfigError::InvalidEnvKey(key.clone()));
            }
        }

        if let Some(smoke) = &self.smoke {
            if smoke.node_count == Some(0) {
                return Err(ConfigError::ZeroNodes);
            }
            if smoke.timeout.is_some_and(|t| t.is_zero()) {
                return Err(ConfigError::NotPositive("smoke.timeout"));
            }
        }
        Ok(())
    }

    /// The spec as it should actually run.
    ///
    /// With the smoke flag off this is the spec unchanged. With it on, the
    /// smoke overrides are applied and the job is told it is a smoke run.
    pub fn resolved(&self) -> TestSpec {
        if !self.smoke_test {
            return self.clone();
        }

        let mut spec = self.clone();
        if let Some(smoke) = &self.smoke {
            if let Some(timeout) = smoke.timeout {
                spec.timeout = timeout;
            }
            if let Some(nodes) = smoke.node_count {
                spec.cluster.node_count = nodes;
            }
            spec.env
                .extend(smoke.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        spec.env.insert(SMOKE_TEST_ENV.to_string(), "1".to_string());
        spec
    }
}

fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
