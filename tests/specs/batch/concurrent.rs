//! `rt batch` specs

use crate::prelude::*;

#[test]
fn batch_of_passing_tests_exits_zero() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "true", "1m"));
    temp.file("b.toml", &spec_toml("beta", "echo METRIC n=1", "1m"));

    temp.rt()
        .args(&["batch", "a.toml", "b.toml"])
        .passes()
        .stdout_has("alpha: succeeded")
        .stdout_has("beta: succeeded");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn batch_reports_in_request_order_and_exits_with_first_failure() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "sleep 1; true", "1m"));
    temp.file("b.toml", &spec_toml("beta", "exit 1", "1m"));
    temp.file("c.toml", &spec_toml("gamma", "exec sleep 30", "1s"));

    temp.rt()
        .args(&[
            "batch",
            "a.toml",
            "b.toml",
            "c.toml",
            "--output",
            "results.json",
        ])
        .exits_with(40);

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(temp.path().join("results.json")).unwrap())
            .unwrap();
    let names: Vec<&str> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["test_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert_eq!(results[2]["outcome"]["status"], "timed_out");
}

#[test]
fn one_bad_spec_stops_the_batch_before_it_starts() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "true", "1m"));

    temp.rt()
        .args(&["batch", "a.toml", "missing.toml"])
        .exits_with(10)
        .stderr_has("missing.toml");
    assert!(!temp.path().join("clusters").exists());
}
