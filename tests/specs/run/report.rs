//! JSON report specs

use crate::prelude::*;

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn output_flag_writes_the_result() {
    let temp = Project::empty();
    temp.file(
        "spec.toml",
        &spec_toml("many_tasks", "echo METRIC tasks_per_second=125.5", "1m"),
    );

    temp.rt()
        .args(&["run", "spec.toml", "--revision", "abc", "--output", "result.json"])
        .passes();

    let report = read_json(&temp.path().join("result.json"));
    assert_eq!(report["test_name"], "many_tasks");
    assert_eq!(report["revision"], "abc");
    assert_eq!(report["outcome"]["status"], "succeeded");
    assert_eq!(report["job_status"], "succeeded");
    assert_eq!(report["exit_code"], 0);
    assert_eq!(report["metrics"]["tasks_per_second"], 125.5);
    assert_eq!(report["error_summary"], serde_json::Value::Null);
    assert_eq!(report["retry_count"], 0);
}

#[test]
fn failed_report_carries_summary_and_tail() {
    let temp = Project::empty();
    temp.file(
        "spec.toml",
        &spec_toml("many_tasks", "echo step one; echo step two >&2; exit 3", "1m"),
    );

    temp.rt()
        .args(&["run", "spec.toml", "--output", "result.json"])
        .exits_with(40);

    let report = read_json(&temp.path().join("result.json"));
    assert_eq!(report["outcome"]["status"], "failed");
    assert_eq!(report["exit_code"], 3);
    assert_eq!(report["error_summary"], "job failed with exit code 3");
    let tail: Vec<String> = serde_json::from_value(report["log_tail"].clone()).unwrap();
    assert!(tail.contains(&"step one".to_string()));
    assert!(tail.contains(&"step two".to_string()));
}

#[test]
fn json_format_prints_the_result() {
    let temp = Project::empty();
    temp.file("spec.toml", &spec_toml("many_tasks", "true", "1m"));

    let out = temp
        .rt()
        .args(&["--format", "json", "run", "spec.toml"])
        .passes()
        .stdout();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["test_name"], "many_tasks");
    assert_eq!(report["smoke_test"], false);
}
