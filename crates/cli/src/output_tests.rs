// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rt_core::{
    BisectReport, ClusterShape, ErrorKind, LogSummary, Outcome, ProbeSummary, ResultParts,
    Revision, RunId, TestSpec, Verdict,
};
use std::time::Duration;

fn result(outcome: Outcome) -> RunResult {
    let spec = TestSpec::new(
        "many_tasks",
        "echo ok",
        ClusterShape::new("m5.xlarge", 1),
        Duration::from_secs(60),
    );
    let mut logs = LogSummary::default();
    logs.metrics.insert("iterations".to_string(), 42.0);
    RunResult::new(
        &spec,
        Some(&Revision::from("r7")),
        ResultParts {
            run_id: RunId::from("run-1"),
            outcome,
            job_status: None,
            exit_code: None,
            logs,
            detail: None,
            duration: Duration::from_secs(90),
            retry_count: 1,
            started_at: chrono::Utc::now(),
            bisect: None,
        },
    )
}

#[test]
fn text_rendering_lists_metrics_and_error() {
    let text = render(&result(Outcome::TimedOut));
    assert!(text.starts_with("many_tasks @ r7: timed out in 1m 30s (retries: 1)"));
    assert!(text.contains("metric iterations = 42"));
    assert!(text.contains("error: job exceeded its timeout"));
}

#[test]
fn successful_result_has_no_error_line() {
    let text = render(&result(Outcome::Succeeded));
    assert!(!text.contains("error:"));
}

#[test]
fn text_rendering_lists_probes() {
    let mut failed = result(Outcome::Failed);
    failed.bisect = Some(BisectReport {
        known_good: Some(Revision::from("r0")),
        known_bad: Revision::from("r7"),
        culprit: Some(Revision::from("r5")),
        probes: vec![ProbeSummary {
            revision: Revision::from("r3"),
            verdict: Verdict::Pass,
            attempts: 1,
        }],
        inconclusive_reason: None,
    });

    let text = render(&failed);
    assert!(text.contains("first bad revision: r5"));
    assert!(text.contains("probe r3 -> pass (1 attempts)"));
}

#[test]
fn batch_exit_code_is_the_first_failure() {
    let results = vec![
        result(Outcome::Succeeded),
        result(Outcome::Errored(ErrorKind::ClusterProvisionTimeout)),
        result(Outcome::Failed),
    ];
    assert_eq!(batch_exit_code(&results), ExitCode::ClusterStartupTimeout);
    assert_eq!(batch_exit_code(&results[..1]), ExitCode::Success);
    assert_eq!(batch_exit_code(&[]), ExitCode::Success);
}

#[test]
fn report_file_is_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.json");
    write_report(&path, &result(Outcome::Failed)).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["test_name"], "many_tasks");
    assert_eq!(value["outcome"]["status"], "failed");
}
