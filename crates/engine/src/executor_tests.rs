// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rt_adapters::{ClusterCall, FakeClusterAdapter, FakeJobAdapter, JobError, ProvisionError};
use rt_core::{
    ClusterRequest, ClusterShape, ClusterStatus, EngineConfig, Event, JobRequest, LogConfig, RunId,
    SystemClock,
};
use std::collections::BTreeMap;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(600);

fn setup() -> (
    Executor<FakeClusterAdapter, FakeJobAdapter, SystemClock>,
    FakeClusterAdapter,
    FakeJobAdapter,
) {
    let clusters = FakeClusterAdapter::new();
    let jobs = FakeJobAdapter::new();
    let executor = Executor::new(
        clusters.clone(),
        jobs.clone(),
        SystemClock,
        PROVISION_TIMEOUT,
        WatchSettings::from_config(&EngineConfig::default()),
        Arc::new(LogPatterns::from_config(&LogConfig::default()).unwrap()),
    );
    (executor, clusters, jobs)
}

fn request() -> ClusterRequest {
    ClusterRequest {
        name: "exec-test".to_string(),
        shape: ClusterShape::new("m5.xlarge", 2),
    }
}

fn job_request() -> JobRequest {
    JobRequest {
        name: "exec-job".to_string(),
        test_name: "exec".to_string(),
        command: "true".to_string(),
        env: BTreeMap::new(),
        revision: None,
    }
}

async fn acquire(
    executor: &Executor<FakeClusterAdapter, FakeJobAdapter, SystemClock>,
    cancel: &CancelToken,
) -> Option<RunEvent> {
    executor
        .execute(Effect::AcquireCluster { request: request() }, None, cancel)
        .await
        .event
}

#[tokio::test(start_paused = true)]
async fn acquire_waits_for_ready_cluster() {
    let (executor, clusters, _) = setup();
    clusters.set_ready_delay(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let event = acquire(&executor, &CancelToken::new()).await;

    let Some(RunEvent::ClusterAcquired { cluster }) = event else {
        panic!("expected ClusterAcquired, got {event:?}");
    };
    assert_eq!(cluster.status, ClusterStatus::Ready);
    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn acquire_failure_keeps_retryability() {
    let (executor, clusters, _) = setup();
    clusters.fail_next(ProvisionError::transient("no capacity"));

    let event = acquire(&executor, &CancelToken::new()).await;
    assert_eq!(
        event,
        Some(RunEvent::ClusterFailed {
            retryable: true,
            cause: "no capacity".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn hanging_acquire_times_out() {
    let (executor, clusters, _) = setup();
    clusters.set_hang(true);

    let start = tokio::time::Instant::now();
    let event = acquire(&executor, &CancelToken::new()).await;

    assert_eq!(event, Some(RunEvent::ProvisionTimedOut));
    assert!(start.elapsed() >= PROVISION_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_acquire() {
    let (executor, clusters, _) = setup();
    clusters.set_hang(true);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        trigger.cancel();
    });

    assert_eq!(acquire(&executor, &cancel).await, Some(RunEvent::Cancel));
}

#[tokio::test]
async fn cancelled_token_skips_acquire() {
    let (executor, clusters, _) = setup();
    let cancel = CancelToken::new();
    cancel.cancel();

    assert_eq!(acquire(&executor, &cancel).await, Some(RunEvent::Cancel));
    assert!(clusters.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn backoff_sleeps_for_the_delay() {
    let (executor, _, _) = setup();

    let start = tokio::time::Instant::now();
    let executed = executor
        .execute(
            Effect::Backoff {
                delay: Duration::from_secs(30),
            },
            None,
            &CancelToken::new(),
        )
        .await;

    assert_eq!(executed.event, Some(RunEvent::BackoffElapsed));
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test]
async fn submit_maps_rejection_to_submit_failed() {
    let (executor, clusters, jobs) = setup();
    let cluster = clusters.acquire(&request()).await.unwrap();
    jobs.fail_next_submit(JobError::Platform("api unavailable".to_string()));

    let executed = executor
        .execute(
            Effect::SubmitJob {
                cluster,
                request: job_request(),
            },
            None,
            &CancelToken::new(),
        )
        .await;

    assert_eq!(
        executed.event,
        Some(RunEvent::SubmitFailed {
            retryable: true,
            cause: "job platform error: api unavailable".to_string()
        })
    );
}

#[tokio::test]
async fn release_and_cancel_produce_no_event() {
    let (executor, clusters, jobs) = setup();
    let cancel = CancelToken::new();
    let cluster = clusters.acquire(&request()).await.unwrap();
    let job = jobs.submit(&cluster, &job_request()).await.unwrap();

    let executed = executor
        .execute(Effect::CancelJob { job: job.clone() }, None, &cancel)
        .await;
    assert!(executed.event.is_none());
    let executed = executor
        .execute(
            Effect::ReleaseCluster {
                cluster: cluster.clone(),
            },
            None,
            &cancel,
        )
        .await;
    assert!(executed.event.is_none());

    assert_eq!(jobs.cancelled(), vec![job.id]);
    assert_eq!(clusters.release_count(&cluster.id), 1);
    assert!(clusters
        .calls()
        .contains(&ClusterCall::Release { id: cluster.id }));
}

#[tokio::test]
async fn emit_forwards_to_the_event_sink() {
    let (executor, _, _) = setup();
    let (sink, mut rx) = EventSink::channel();
    let executor = executor.with_events(sink);
    let event = Event::RunStarted {
        run_id: RunId::from("run-1"),
        test: "exec".to_string(),
    };

    let executed = executor
        .execute(Effect::Emit(event.clone()), None, &CancelToken::new())
        .await;

    assert!(executed.event.is_none());
    assert_eq!(rx.try_recv().unwrap(), event);
}
