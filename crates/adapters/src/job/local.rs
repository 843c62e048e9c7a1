// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local job adapter
//!
//! Runs the test command with `sh -c` in the cluster's working directory.
//! Output lines land in a per-job buffer; log streams replay the buffer and
//! then follow it until the process has exited and both pipes are drained.

use super::{JobAdapter, JobError, LogStream};
use async_trait::async_trait;
use rt_core::{
    ClusterHandle, JobHandle, JobId, JobReport, JobRequest, JobStatus, LogRecord, LogSource,
    SystemClock,
};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

/// How long to keep reading pipes after the shell exits
const PIPE_DRAIN: Duration = Duration::from_secs(5);

/// Finished jobs kept for late polls and log replays
const FINISHED_RETAINED: usize = 32;

struct LocalJob {
    started: Instant,
    lines: Mutex<Vec<LogRecord>>,
    report: Mutex<JobReport>,
    finished: Mutex<bool>,
    /// Bumped whenever a line is appended or the job finishes
    progress: watch::Sender<u64>,
    cancel: Notify,
}

impl LocalJob {
    fn new() -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            started: Instant::now(),
            lines: Mutex::new(Vec::new()),
            report: Mutex::new(JobReport::new(JobStatus::Running)),
            finished: Mutex::new(false),
            progress,
            cancel: Notify::new(),
        }
    }

    fn push(&self, source: LogSource, line: String) {
        let record = LogRecord::new(self.started.elapsed(), source, line);
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        self.progress.send_modify(|v| *v += 1);
    }

    fn lines_from(&self, offset: usize) -> Vec<LogRecord> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    fn finish(&self, report: JobReport) {
        *self.report.lock().unwrap_or_else(|e| e.into_inner()) = report;
        *self.finished.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.progress.send_modify(|v| *v += 1);
    }

    fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn report(&self) -> JobReport {
        *self.report.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Process-backed job adapter
///
/// Finished jobs and their output are dropped oldest first once more than
/// the retained count have finished.
#[derive(Clone)]
pub struct LocalJobAdapter {
    jobs: Arc<Mutex<HashMap<JobId, Arc<LocalJob>>>>,
    next_id: Arc<AtomicU64>,
    retained: usize,
}

impl Default for LocalJobAdapter {
    fn default() -> Self {
        Self {
            jobs: Arc::default(),
            next_id: Arc::default(),
            retained: FINISHED_RETAINED,
        }
    }
}

impl LocalJobAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retained` finished jobs
    pub fn with_retained(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    /// Number of jobs still tracked
    pub fn tracked(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn track(&self, id: JobId, job: Arc<LocalJob>) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut finished: Vec<(Instant, JobId)> = jobs
            .iter()
            .filter(|(_, job)| job.is_finished())
            .map(|(id, job)| (job.started, id.clone()))
            .collect();
        if finished.len() > self.retained {
            finished.sort_by_key(|(started, _)| *started);
            let excess = finished.len() - self.retained;
            for (_, id) in finished.into_iter().take(excess) {
                tracing::debug!(job_id = %id, "dropping finished job");
                jobs.remove(&id);
            }
        }
        jobs.insert(id, job);
    }

    fn get(&self, id: &JobId) -> Option<Arc<LocalJob>> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

async fn pump(reader: impl AsyncRead + Unpin, source: LogSource, job: Arc<LocalJob>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => job.push(source, line),
            Ok(None) => break,
            Err(e) => {
                job.push(LogSource::System, format!("output read error: {e}"));
                break;
            }
        }
    }
}

#[async_trait]
impl JobAdapter for LocalJobAdapter {
    async fn submit(
        &self,
        cluster: &ClusterHandle,
        request: &JobRequest,
    ) -> Result<JobHandle, JobError> {
        let Some(workdir) = cluster.workdir.as_ref() else {
            return Err(JobError::Rejected {
                retryable: false,
                cause: format!("cluster {} has no working directory", cluster.id),
            });
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&request.command)
            .current_dir(workdir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobError::Rejected {
                retryable: false,
                cause: format!("spawn failed: {e}"),
            })?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = JobHandle::new(
            format!("local-{}-{}", request.name, n),
            cluster.id.clone(),
            &SystemClock,
        );
        let job = Arc::new(LocalJob::new());
        self.track(handle.id.clone(), Arc::clone(&job));

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::spawn(async move {
            let out = stdout.map(|r| tokio::spawn(pump(r, LogSource::Stdout, Arc::clone(&job))));
            let err = stderr.map(|r| tokio::spawn(pump(r, LogSource::Stderr, Arc::clone(&job))));

            // `None` when cancelled before the process exited
            let status = tokio::select! {
                status = child.wait() => Some(status),
                _ = job.cancel.notified() => None,
            };
            let report = match status {
                Some(Ok(status)) => match status.code() {
                    Some(0) => JobReport::exited(JobStatus::Succeeded, 0),
                    Some(code) => JobReport::exited(JobStatus::Failed, code),
                    None => JobReport::new(JobStatus::Failed),
                },
                Some(Err(e)) => {
                    job.push(LogSource::System, format!("wait failed: {e}"));
                    JobReport::new(JobStatus::Failed)
                }
                None => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "kill failed");
                    }
                    JobReport::new(JobStatus::Cancelled)
                }
            };

            // Background children of the shell may hold the pipes open
            for task in [out, err].into_iter().flatten() {
                let abort = task.abort_handle();
                if tokio::time::timeout(PIPE_DRAIN, task).await.is_err() {
                    abort.abort();
                }
            }
            job.finish(report);
        });

        Ok(handle)
    }

    async fn poll(&self, job: &JobHandle) -> Result<Option<JobReport>, JobError> {
        let entry = self
            .get(&job.id)
            .ok_or_else(|| JobError::NotFound(job.id.clone()))?;
        if entry.is_finished() {
            return Ok(Some(entry.report()));
        }
        Ok(Some(JobReport::new(JobStatus::Running)))
    }

    fn stream_logs(&self, job: &JobHandle) -> LogStream {
        let (tx, rx) = mpsc::channel(256);
        if let Some(entry) = self.get(&job.id) {
            tokio::spawn(async move {
                let mut progress = entry.progress.subscribe();
                let mut sent = 0;
                loop {
                    let _ = progress.borrow_and_update();
                    let finished = entry.is_finished();
                    for record in entry.lines_from(sent) {
                        if tx.send(record).await.is_err() {
                            return;
                        }
                        sent += 1;
                    }
                    if finished {
                        return;
                    }
                    if progress.changed().await.is_err() {
                        return;
                    }
                }
            });
        }
        Box::pin(ReceiverStream::new(rx))
    }

    async fn cancel(&self, job: &JobHandle) -> Result<(), JobError> {
        let entry = self
            .get(&job.id)
            .ok_or_else(|| JobError::NotFound(job.id.clone()))?;
        if !entry.is_finished() {
            entry.cancel.notify_one();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
