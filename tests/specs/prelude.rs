//! Shared helpers for CLI specs
//!
//! Specs drive the `rt` binary from the same target directory, so run them
//! with `cargo test --workspace` to make sure it is built.

#![allow(dead_code)]

pub use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// Engine config tuned for fast local runs
const FAST_CONFIG: &str = r#"
poll_interval = "50ms"
submission_grace = "30s"
heartbeat_interval = "1s"
log_drain_timeout = "2s"
provision_timeout = "30s"

[backoff]
base = "10ms"
max = "100ms"
"#;

/// A spec file that runs `command` on a single-node local cluster
pub fn spec_toml(name: &str, command: &str, timeout: &str) -> String {
    format!(
        r#"name = "{name}"
command = '{command}'
timeout = "{timeout}"

[cluster]
instance_types = ["local"]
node_count = 1
"#
    )
}

/// Scratch directory holding specs, the engine config and cluster dirs
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let project = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        let config = format!(
            "{FAST_CONFIG}\n[local]\nwork_root = '{}'\n",
            project.path().join("clusters").display()
        );
        project.file("engine.toml", &config);
        project
    }

    /// Append settings to the project's engine config
    pub fn config(&self, extra: &str) {
        let path = self.path().join("engine.toml");
        let mut text = std::fs::read_to_string(&path).unwrap();
        text.push('\n');
        text.push_str(extra);
        std::fs::write(&path, text).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// `rt` with the project's engine config
    pub fn rt(&self) -> CliBuilder {
        let mut cmd = assert_cmd::Command::cargo_bin("rt").unwrap();
        cmd.current_dir(self.path())
            .env("RT_LOG", "warn")
            .arg("--config")
            .arg(self.path().join("engine.toml"));
        CliBuilder { cmd }
    }

    /// `rt` without any config file
    pub fn rt_bare(&self) -> CliBuilder {
        let mut cmd = assert_cmd::Command::cargo_bin("rt").unwrap();
        cmd.current_dir(self.path()).env("RT_LOG", "warn");
        CliBuilder { cmd }
    }

    /// Cluster directories still on disk
    pub fn live_clusters(&self) -> usize {
        match std::fs::read_dir(self.path().join("clusters")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub struct CliBuilder {
    cmd: assert_cmd::Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and expect exit code 0
    pub fn passes(self) -> RunAssert {
        self.exits_with(0)
    }

    /// Run and expect a specific exit code
    pub fn exits_with(mut self, code: i32) -> RunAssert {
        let assert = self.cmd.assert().code(code);
        RunAssert {
            output: assert.get_output().clone(),
        }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        assert!(
            predicate::str::contains(expected).eval(&self.stdout()),
            "stdout should contain {expected:?}, got:\n{}",
            self.stdout()
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        assert!(
            predicate::str::contains(expected).eval(&self.stderr()),
            "stderr should contain {expected:?}, got:\n{}",
            self.stderr()
        );
        self
    }
}
