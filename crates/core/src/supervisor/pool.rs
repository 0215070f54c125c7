//! Bounded pool of supervised conversion jobs.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::SupervisorError;
use super::handle::JobHandle;
use crate::config::Config;
use crate::converter::{
    ConversionJob, JobContext, JobControl, JobEvent, JobOutcome, JobSnapshot, JobState,
};
use crate::media::MediaProber;

/// Receiving end of a supervisor's event stream.
///
/// Events arrive in the order they happen; each job yields exactly one
/// `JobEvent::Finished`, in completion order.
pub type SupervisorEvents = mpsc::UnboundedReceiver<JobEvent>;

/// Tracks statistics for the conversion pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_succeeded: AtomicU64,
    total_failed: AtomicU64,
    total_cancelled: AtomicU64,
}

impl PoolStats {
    fn record(&self, state: JobState) {
        let counter = match state {
            JobState::Succeeded => &self.total_succeeded,
            JobState::Cancelled => &self.total_cancelled,
            _ => &self.total_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Status of the conversion pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorStatus {
    /// Whether `cancel_all` was called.
    pub closed: bool,
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Number of running jobs.
    pub active_jobs: usize,
    /// Number of jobs waiting for a slot.
    pub queued_jobs: usize,
    /// Jobs that succeeded.
    pub total_succeeded: u64,
    /// Jobs that failed.
    pub total_failed: u64,
    /// Jobs that were cancelled.
    pub total_cancelled: u64,
}

/// A registered, not yet finished job.
struct RegistryEntry {
    output_path: PathBuf,
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<PathBuf, RegistryEntry>>>;

/// Runs conversion jobs with bounded concurrency.
pub struct JobSupervisor {
    max_concurrent: usize,
    context: Arc<JobContext>,
    semaphore: Arc<Semaphore>,
    registry: Registry,
    events: mpsc::UnboundedSender<JobEvent>,
    stats: Arc<PoolStats>,
    closed: AtomicBool,
}

impl JobSupervisor {
    /// Creates a supervisor and the receiving end of its event stream.
    pub fn new(config: &Config, prober: Arc<dyn MediaProber>) -> (Self, SupervisorEvents) {
        let max_concurrent = config.supervisor.max_parallel_jobs.max(1);
        let (events, events_rx) = mpsc::unbounded_channel();

        let supervisor = Self {
            max_concurrent,
            context: Arc::new(JobContext::new(config, prober)),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            registry: Arc::new(Mutex::new(HashMap::new())),
            events,
            stats: Arc::new(PoolStats::default()),
            closed: AtomicBool::new(false),
        };

        (supervisor, events_rx)
    }

    /// Submits a job.
    ///
    /// Returns immediately; the job waits for a free slot in the background.
    pub async fn submit(&self, job: ConversionJob) -> Result<JobHandle, SupervisorError> {
        let mut registry = self.registry.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(SupervisorError::Closed);
        }

        let source = job.source_path().to_path_buf();
        if registry.contains_key(&source) {
            return Err(SupervisorError::DuplicateJob(source));
        }
        let output_path = job.output_path().to_path_buf();
        if registry.values().any(|entry| entry.output_path == output_path) {
            return Err(SupervisorError::OutputClaimed(output_path));
        }

        let (state_tx, state_rx) = watch::channel(JobSnapshot::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel_tx = Arc::new(cancel_tx);

        let handle = JobHandle::new(
            source.clone(),
            output_path.clone(),
            state_rx,
            Arc::clone(&cancel_tx),
        );
        let control = JobControl {
            state: state_tx,
            cancel: cancel_rx,
            events: self.events.clone(),
        };

        let context = Arc::clone(&self.context);
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        let task_registry = Arc::clone(&self.registry);
        let events = self.events.clone();
        let task_source = source.clone();

        stats.queued.fetch_add(1, Ordering::Relaxed);
        debug!(source = %source.display(), "Job submitted");

        // The registry lock is held until the entry is inserted, so the task
        // cannot remove itself before it is registered.
        let task = tokio::spawn(async move {
            let (outcome, permit) = Self::run_job(job, control, &context, semaphore, &stats).await;
            stats.record(outcome.state);

            task_registry.lock().await.remove(&task_source);
            let _ = events.send(JobEvent::Finished(outcome));

            // Released only after the terminal event is out, so the next job
            // cannot start before this one is reported finished.
            drop(permit);
        });

        registry.insert(
            source,
            RegistryEntry {
                output_path,
                cancel: cancel_tx,
                task,
            },
        );

        Ok(handle)
    }

    async fn run_job(
        job: ConversionJob,
        control: JobControl,
        context: &JobContext,
        semaphore: Arc<Semaphore>,
        stats: &PoolStats,
    ) -> (JobOutcome, Option<OwnedSemaphorePermit>) {
        let mut cancel = control.cancel.clone();
        let permit = tokio::select! {
            permit = semaphore.acquire_owned() => permit.ok(),
            Ok(_) = cancel.wait_for(|c| *c) => None,
        };
        stats.queued.fetch_sub(1, Ordering::Relaxed);

        let Some(permit) = permit else {
            return (job.cancel_before_start(&control), None);
        };

        stats.active.fetch_add(1, Ordering::Relaxed);
        let outcome = job.run(context, control).await;
        stats.active.fetch_sub(1, Ordering::Relaxed);

        (outcome, Some(permit))
    }

    /// Cancels every outstanding job and refuses new submissions.
    ///
    /// Returns only after every job is terminal and every encoder process has
    /// been reaped.
    pub async fn cancel_all(&self) {
        let entries: Vec<RegistryEntry> = {
            let mut registry = self.registry.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            self.semaphore.close();
            registry.drain().map(|(_, entry)| entry).collect()
        };

        if entries.is_empty() {
            return;
        }
        info!(count = entries.len(), "Cancelling conversion jobs");

        for entry in &entries {
            entry.cancel.send_replace(true);
        }

        let results = join_all(entries.into_iter().map(|entry| entry.task)).await;
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "Conversion task ended abnormally");
            }
        }
        info!("All conversion jobs stopped");
    }

    /// Whether `cancel_all` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sources of jobs that have not finished yet.
    pub async fn active_sources(&self) -> Vec<PathBuf> {
        self.registry.lock().await.keys().cloned().collect()
    }

    /// Returns the current pool status.
    pub fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            closed: self.is_closed(),
            max_concurrent: self.max_concurrent,
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            queued_jobs: self.stats.queued.load(Ordering::Relaxed) as usize,
            total_succeeded: self.stats.total_succeeded.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
            total_cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

impl Drop for JobSupervisor {
    fn drop(&mut self) {
        // Best effort: jobs terminate their own encoders once signalled.
        if let Ok(registry) = self.registry.try_lock() {
            for entry in registry.values() {
                entry.cancel.send_replace(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFile;
    use crate::testing::MockProber;
    use std::path::Path;

    fn supervisor_with(config: &Config) -> (JobSupervisor, SupervisorEvents) {
        JobSupervisor::new(config, Arc::new(MockProber::new()))
    }

    fn job(dir: &Path, name: &str, config: &Config) -> ConversionJob {
        ConversionJob::new(MediaFile::unprobed(dir.join(name)), &config.encode)
    }

    #[tokio::test]
    async fn test_submit_after_cancel_all_is_closed() {
        let config = Config::default();
        let (supervisor, _events) = supervisor_with(&config);

        supervisor.cancel_all().await;
        assert!(supervisor.is_closed());

        let dir = tempfile::tempdir().unwrap();
        let result = supervisor.submit(job(dir.path(), "a.mkv", &config)).await;
        assert_eq!(result.unwrap_err(), SupervisorError::Closed);
    }

    #[tokio::test]
    async fn test_preflight_failure_is_reported() {
        let config = Config::default();
        let (supervisor, mut events) = supervisor_with(&config);
        let dir = tempfile::tempdir().unwrap();

        let source = dir.path().join("a.mkv");
        std::fs::write(&source, b"source").unwrap();
        let handle = supervisor
            .submit(job(dir.path(), "a.mkv", &config).with_output_path(&source))
            .await
            .unwrap();

        let snapshot = handle.wait().await;
        assert_eq!(snapshot.state, JobState::Failed);

        match events.recv().await {
            Some(JobEvent::Finished(outcome)) => {
                assert_eq!(outcome.state, JobState::Failed);
                assert!(matches!(
                    outcome.error,
                    Some(crate::converter::ConversionError::OutputIsSource { .. })
                ));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(supervisor.status().total_failed, 1);
        assert!(supervisor.active_sources().await.is_empty());
        assert_eq!(std::fs::read(&source).unwrap(), b"source");
    }

    #[tokio::test]
    async fn test_status_reports_limit() {
        let mut config = Config::default();
        config.supervisor.max_parallel_jobs = 3;
        let (supervisor, _events) = supervisor_with(&config);

        let status = supervisor.status();
        assert_eq!(status.max_concurrent, 3);
        assert_eq!(status.active_jobs, 0);
        assert!(!status.closed);
    }
}
