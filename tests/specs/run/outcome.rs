//! Run outcome specs
//!
//! Each way a run can end maps to its own exit code, and the cluster is
//! always torn down.

use crate::prelude::*;

#[test]
fn passing_test_exits_zero_with_metrics() {
    let temp = Project::empty();
    temp.file(
        "spec.toml",
        &spec_toml("many_tasks", "echo METRIC iterations=42", "1m"),
    );

    temp.rt()
        .args(&["run", "spec.toml"])
        .passes()
        .stdout_has("many_tasks: succeeded")
        .stdout_has("metric iterations = 42");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn failing_test_exits_with_test_failure_code() {
    let temp = Project::empty();
    temp.file(
        "spec.toml",
        &spec_toml(
            "many_tasks",
            "echo \"Traceback (most recent call last)\"; exit 1",
            "1m",
        ),
    );

    temp.rt()
        .args(&["run", "spec.toml"])
        .exits_with(40)
        .stdout_has("many_tasks: failed")
        .stdout_has("error: Traceback (most recent call last)");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn hanging_test_exits_with_timeout_code() {
    let temp = Project::empty();
    temp.file("spec.toml", &spec_toml("hang", "exec sleep 30", "1s"));

    temp.rt()
        .args(&["run", "spec.toml"])
        .exits_with(42)
        .stdout_has("hang: timed out")
        .stdout_has("error: job exceeded its timeout");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn revision_reaches_the_job_environment() {
    let temp = Project::empty();
    temp.file(
        "spec.toml",
        &spec_toml("rev", "test \"$RT_REVISION\" = abc123", "1m"),
    );

    temp.rt()
        .args(&["run", "spec.toml", "--revision", "abc123"])
        .passes()
        .stdout_has("rev @ abc123: succeeded");
    temp.rt()
        .args(&["run", "spec.toml", "--revision", "def456"])
        .exits_with(40);
}

#[test]
fn smoke_flag_applies_overrides() {
    let temp = Project::empty();
    let spec = format!(
        "{}\n[smoke]\nenv = {{ SMOKE_SIZE = \"small\" }}\n",
        spec_toml(
            "smoke",
            "test \"$IS_SMOKE_TEST\" = 1 && test \"$SMOKE_SIZE\" = small",
            "1m",
        )
    );
    temp.file("spec.toml", &spec);

    temp.rt().args(&["run", "spec.toml", "--smoke"]).passes();
    temp.rt().args(&["run", "spec.toml"]).exits_with(40);
}

#[test]
fn env_from_the_spec_reaches_the_job() {
    let temp = Project::empty();
    let spec = format!(
        "{}\n[env]\nWORKLOAD = \"many_tasks\"\n",
        spec_toml("env", "test \"$WORKLOAD\" = many_tasks", "1m")
    );
    temp.file("spec.toml", &spec);

    temp.rt().args(&["run", "spec.toml"]).passes();
}
