// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rt_adapters::{FakeClusterAdapter, FakeJobAdapter, FakeJobScript};
use rt_core::{
    ClusterRequest, ClusterShape, JobReport, JobRequest, JobStatus, LogConfig, SystemClock,
};
use std::collections::BTreeMap;

struct Harness {
    clusters: FakeClusterAdapter,
    jobs: FakeJobAdapter,
    clock: SystemClock,
    cancel: CancelToken,
    settings: WatchSettings,
}

impl Harness {
    fn new() -> Self {
        Self {
            clusters: FakeClusterAdapter::new(),
            jobs: FakeJobAdapter::new(),
            clock: SystemClock,
            cancel: CancelToken::new(),
            settings: WatchSettings {
                poll_interval: Duration::from_secs(10),
                submission_grace: Duration::from_secs(60),
                heartbeat_interval: Duration::from_secs(30),
                log_drain_timeout: Duration::from_secs(5),
            },
        }
    }

    fn watcher(&self) -> JobWatch<'_, FakeClusterAdapter, FakeJobAdapter, SystemClock> {
        JobWatch {
            clusters: &self.clusters,
            jobs: &self.jobs,
            clock: &self.clock,
            settings: self.settings,
            patterns: Arc::new(LogPatterns::from_config(&LogConfig::default()).unwrap()),
            cancel: &self.cancel,
        }
    }

    async fn start(&self) -> (ClusterHandle, JobHandle) {
        let cluster = self
            .clusters
            .acquire(&ClusterRequest {
                name: "watch".to_string(),
                shape: ClusterShape::new("m5.xlarge", 2),
            })
            .await
            .unwrap();
        let job = self
            .jobs
            .submit(
                &cluster,
                &JobRequest {
                    name: "watch-job".to_string(),
                    test_name: "watch".to_string(),
                    command: "python watch.py".to_string(),
                    env: BTreeMap::new(),
                    revision: None,
                },
            )
            .await
            .unwrap();
        (cluster, job)
    }
}

#[tokio::test(start_paused = true)]
async fn terminal_status_ends_the_watch_with_aggregated_logs() {
    let h = Harness::new();
    h.jobs.set_default(
        FakeJobScript::fail(1)
            .after(Duration::from_secs(25))
            .with_logs(&["METRIC throughput=12.5", "FATAL: worker died", "bye"]),
    );
    let (cluster, job) = h.start().await;

    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(600))
        .await;

    assert_eq!(
        watched.event,
        RunEvent::JobUpdated {
            report: JobReport::exited(JobStatus::Failed, 1)
        }
    );
    assert_eq!(watched.logs.metrics.get("throughput"), Some(&12.5));
    assert_eq!(watched.logs.fatal_line.as_deref(), Some("FATAL: worker died"));
    assert_eq!(watched.logs.tail.last().map(String::as_str), Some("bye"));
}

#[tokio::test(start_paused = true)]
async fn hanging_job_hits_the_deadline() {
    let h = Harness::new();
    h.jobs.set_default(FakeJobScript::hang());
    let (cluster, job) = h.start().await;

    let start = tokio::time::Instant::now();
    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(45))
        .await;

    assert_eq!(watched.event, RunEvent::DeadlineExceeded);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(45), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(46), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn silent_job_is_lost_after_the_grace_period() {
    let h = Harness::new();
    h.jobs.set_default(FakeJobScript::silent());
    let (cluster, job) = h.start().await;

    let start = tokio::time::Instant::now();
    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(3600))
        .await;

    assert_eq!(watched.event, RunEvent::JobLost);
    assert!(start.elapsed() >= h.settings.submission_grace);
    assert!(start.elapsed() < Duration::from_secs(3600));
}

#[tokio::test(start_paused = true)]
async fn silent_job_still_times_out_when_the_deadline_comes_first() {
    let h = Harness::new();
    h.jobs.set_default(FakeJobScript::silent());
    let (cluster, job) = h.start().await;

    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(20))
        .await;

    assert_eq!(watched.event, RunEvent::DeadlineExceeded);
}

#[tokio::test(start_paused = true)]
async fn dead_cluster_is_reported_lost() {
    let h = Harness::new();
    h.jobs.set_default(FakeJobScript::hang());
    h.clusters.lose_next(Duration::from_secs(40));
    let (cluster, job) = h.start().await;

    let start = tokio::time::Instant::now();
    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(3600))
        .await;

    assert_eq!(watched.event, RunEvent::ClusterLost);
    // Noticed on the first heartbeat after the cluster died
    assert!(start.elapsed() >= Duration::from_secs(40));
    assert!(start.elapsed() <= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_the_watch() {
    let h = Harness::new();
    h.jobs.set_default(FakeJobScript::hang());
    let (cluster, job) = h.start().await;

    let cancel = h.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        cancel.cancel();
    });

    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(3600))
        .await;
    assert_eq!(watched.event, RunEvent::Cancel);
}

#[tokio::test(start_paused = true)]
async fn answered_heartbeats_are_reported_back() {
    let h = Harness::new();
    let script = FakeJobScript::succeed().after(Duration::from_secs(75));
    h.jobs.set_default(script);
    let (cluster, job) = h.start().await;

    let start = h.clock.now();
    let watched = h
        .watcher()
        .watch(&job, Some(&cluster), Duration::from_secs(600))
        .await;

    // Heartbeats at 30s and 60s; the job ends at 75s
    let Some(beat) = watched.last_heartbeat else {
        panic!("no heartbeat recorded");
    };
    assert!(beat >= start + Duration::from_secs(60), "{beat:?}");
    assert!(beat < start + Duration::from_secs(75), "{beat:?}");

    let refreshed = cluster.heartbeat(beat);
    assert!(refreshed.last_heartbeat > cluster.last_heartbeat);
}

#[tokio::test(start_paused = true)]
async fn no_heartbeat_without_a_cluster() {
    let h = Harness::new();
    let script = FakeJobScript::succeed().after(Duration::from_secs(75));
    h.jobs.set_default(script);
    let (_, job) = h.start().await;

    let watched = h
        .watcher()
        .watch(&job, None, Duration::from_secs(600))
        .await;
    assert!(watched.last_heartbeat.is_none());
}
