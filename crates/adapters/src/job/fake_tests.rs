// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rt_core::{ClusterShape, ClusterStatus};
use std::collections::BTreeMap;
use tokio_stream::StreamExt;

fn cluster() -> ClusterHandle {
    let clock = SystemClock;
    ClusterHandle::new("cluster-1", ClusterShape::new("m5.xlarge", 2), &clock)
        .transition(ClusterStatus::Ready, &clock)
}

fn request(revision: Option<&str>) -> JobRequest {
    JobRequest {
        name: "job".to_string(),
        test_name: "job".to_string(),
        command: "python run.py".to_string(),
        env: BTreeMap::new(),
        revision: revision.map(Revision::from),
    }
}

#[tokio::test(start_paused = true)]
async fn fake_job_finishes_after_scripted_duration() {
    let adapter = FakeJobAdapter::new();
    adapter.set_default(FakeJobScript::fail(2).after(Duration::from_secs(10)));

    let job = adapter.submit(&cluster(), &request(None)).await.unwrap();
    assert_eq!(
        adapter.poll(&job).await.unwrap(),
        Some(JobReport::new(JobStatus::Running))
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        adapter.poll(&job).await.unwrap(),
        Some(JobReport::exited(JobStatus::Failed, 2))
    );
}

#[tokio::test]
async fn fake_job_scripts_by_revision() {
    let adapter = FakeJobAdapter::new();
    adapter.script(Some(Revision::from("bad")), FakeJobScript::fail(1));
    adapter.push_attempt(Some(Revision::from("bad")), FakeJobScript::succeed());

    let first = adapter.submit(&cluster(), &request(Some("bad"))).await.unwrap();
    let second = adapter.submit(&cluster(), &request(Some("bad"))).await.unwrap();
    let other = adapter.submit(&cluster(), &request(Some("good"))).await.unwrap();

    let status = |r: Option<JobReport>| r.map(|r| r.status);
    assert_eq!(status(adapter.poll(&first).await.unwrap()), Some(JobStatus::Succeeded));
    assert_eq!(status(adapter.poll(&second).await.unwrap()), Some(JobStatus::Failed));
    assert_eq!(status(adapter.poll(&other).await.unwrap()), Some(JobStatus::Succeeded));
    assert_eq!(
        adapter.submitted_revisions(),
        vec![
            Some(Revision::from("bad")),
            Some(Revision::from("bad")),
            Some(Revision::from("good"))
        ]
    );
}

#[tokio::test]
async fn fake_silent_job_never_reports() {
    let adapter = FakeJobAdapter::new();
    adapter.set_default(FakeJobScript::silent());
    let job = adapter.submit(&cluster(), &request(None)).await.unwrap();
    assert_eq!(adapter.poll(&job).await.unwrap(), None);
}

#[tokio::test]
async fn fake_cancel_is_recorded_and_reported() {
    let adapter = FakeJobAdapter::new();
    adapter.set_default(FakeJobScript::hang());
    let job = adapter.submit(&cluster(), &request(None)).await.unwrap();

    adapter.cancel(&job).await.unwrap();
    assert_eq!(adapter.cancelled(), vec![job.id.clone()]);
    assert_eq!(
        adapter.poll(&job).await.unwrap().map(|r| r.status),
        Some(JobStatus::Cancelled)
    );
}

#[tokio::test]
async fn fake_submit_failures_are_queued() {
    let adapter = FakeJobAdapter::new();
    adapter.fail_next_submit(JobError::Rejected {
        retryable: true,
        cause: "queue full".to_string(),
    });

    let err = adapter.submit(&cluster(), &request(None)).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(adapter.submit(&cluster(), &request(None)).await.is_ok());
}

#[tokio::test]
async fn fake_logs_replay_script_lines() {
    let adapter = FakeJobAdapter::new();
    adapter.set_default(FakeJobScript::succeed().with_logs(&["METRIC x=1", "done"]));
    let job = adapter.submit(&cluster(), &request(None)).await.unwrap();

    for _ in 0..2 {
        let lines: Vec<String> = adapter.stream_logs(&job).map(|r| r.line).collect().await;
        assert_eq!(lines, vec!["METRIC x=1", "done"]);
    }
}
