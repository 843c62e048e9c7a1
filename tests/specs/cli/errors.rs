//! Error handling specs
//!
//! Broken inputs exit with the config code before anything is provisioned.

use crate::prelude::*;

#[test]
fn missing_spec_file_is_a_config_error() {
    let temp = Project::empty();
    temp.rt()
        .args(&["run", "nope.toml"])
        .exits_with(10)
        .stderr_has("failed to read");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn invalid_spec_is_rejected_before_provisioning() {
    let temp = Project::empty();
    let spec = spec_toml("broken", "echo hi", "1m").replace("node_count = 1", "node_count = 0");
    temp.file("broken.toml", &spec);

    temp.rt()
        .args(&["run", "broken.toml"])
        .exits_with(10)
        .stderr_has("node count");
    assert!(!temp.path().join("clusters").exists());
}

#[test]
fn invalid_engine_config_is_a_config_error() {
    let temp = Project::empty();
    temp.file("bad.toml", "poll_interval = \"0s\"\n");
    temp.file("ok.toml", &spec_toml("ok", "true", "1m"));

    temp.rt_bare()
        .args(&["--config", "bad.toml", "run", "ok.toml"])
        .exits_with(10)
        .stderr_has("poll_interval");
}

#[test]
fn unparseable_spec_names_the_file() {
    let temp = Project::empty();
    temp.file("garbage.toml", "name = ");

    temp.rt()
        .args(&["run", "garbage.toml"])
        .exits_with(10)
        .stderr_has("garbage.toml");
}
