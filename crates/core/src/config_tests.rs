// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn parse(text: &str) -> Result<EngineConfig, ConfigError> {
    EngineConfig::from_toml(text, Path::new("engine.toml"))
}

#[test]
fn empty_file_yields_defaults() {
    let config = parse("").unwrap();
    assert_eq!(config, EngineConfig::default());
    config.validate().unwrap();
}

#[test]
fn parses_partial_overrides() {
    let config = parse(
        r#"
provision_timeout = "5m"
poll_interval = "2s"

[backoff]
base = "1s"

[bisect]
max_probes = 8

[resource_classes]
gpu-pool = 2

[local]
work_root = "/var/tmp/rt"
"#,
    )
    .unwrap();

    assert_eq!(config.provision_timeout, Duration::from_secs(300));
    assert_eq!(config.poll_interval, Duration::from_secs(2));
    assert_eq!(config.backoff.base, Duration::from_secs(1));
    // Unspecified nested fields keep their defaults
    assert_eq!(config.backoff.max, BackoffConfig::default().max);
    assert_eq!(config.bisect.max_probes, 8);
    assert_eq!(config.class_capacity("gpu-pool"), 2);
    assert_eq!(config.class_capacity("anything-else"), 1);
    assert_eq!(config.local.work_root, Some(PathBuf::from("/var/tmp/rt")));
}

#[test]
fn rejects_zero_poll_interval() {
    let err = parse(r#"poll_interval = "0s""#).unwrap_err();
    assert!(matches!(err, ConfigError::NotPositive("poll_interval")));
}

#[test]
fn rejects_zero_capacity_class() {
    let err = parse("[resource_classes]\nbig = 0").unwrap_err();
    assert!(matches!(err, ConfigError::NotPositive(_)));
}

#[test]
fn rejects_invalid_metric_pattern() {
    let err = parse("[logs]\nmetric_pattern = \"(unclosed\"").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { .. }));
}

#[test]
fn rejects_metric_pattern_without_named_groups() {
    let err = parse("[logs]\nmetric_pattern = \"METRIC (\\\\w+)\"").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { .. }));
}

#[test]
fn load_reports_missing_file() {
    let err = EngineConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
