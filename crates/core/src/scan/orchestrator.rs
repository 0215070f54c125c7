//! Scan orchestrator implementation.
//!
//! Each scan runs on its own control task:
//! - Traversal: a blocking walker streams paths in traversal order
//! - Classification: sequential, one probe at a time
//! - Conversion: delegated to a per-scan `JobSupervisor`

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::ScanError;
use super::types::{ScanEvent, ScanSummary, ScanTally};
use super::walker::spawn_walker;
use crate::config::{Config, EncodeConfig};
use crate::converter::{ConversionError, ConversionJob, JobEvent, JobOutcome, JobState};
use crate::media::{ClassificationResult, MediaFile, MediaProber};
use crate::profile::TargetProfile;
use crate::supervisor::{JobSupervisor, SupervisorError, SupervisorEvents};

/// Buffer size of the walker channel.
const WALK_BUFFER_SIZE: usize = 64;

/// Controls shared between a scan task and its orchestrator.
struct ScanControl {
    cancel: watch::Sender<bool>,
    supervisor: JobSupervisor,
}

type ActiveScans = Arc<Mutex<HashMap<u64, Arc<ScanControl>>>>;

/// Entry point for scanning directory trees.
pub struct ScanOrchestrator {
    config: Config,
    prober: Arc<dyn MediaProber>,
    active: ActiveScans,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl ScanOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config, prober: Arc<dyn MediaProber>) -> Self {
        Self {
            config,
            prober,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Starts scanning `root`.
    ///
    /// With `convert_unsupported`, every incompatible file is submitted for
    /// conversion. The root is validated before traversal starts.
    pub async fn run_scan(
        &self,
        root: impl AsRef<Path>,
        convert_unsupported: bool,
    ) -> Result<ScanSession, ScanError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::Closed);
        }
        let root = validate_root(root.as_ref()).await?;

        let (supervisor, job_events) = JobSupervisor::new(&self.config, Arc::clone(&self.prober));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let control = Arc::new(ScanControl {
            cancel: cancel_tx,
            supervisor,
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut active = self.active.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(ScanError::Closed);
            }
            active.insert(id, Arc::clone(&control));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scan = ScanRun {
            tally: ScanTally::new(root.clone()),
            root,
            convert_unsupported,
            follow_links: self.config.scan.follow_links,
            profile: self.config.profile.clone(),
            encode: self.config.encode.clone(),
            prober: Arc::clone(&self.prober),
            control,
            cancel: cancel_rx,
            events: events_tx,
            own_outputs: HashSet::new(),
            pending_jobs: 0,
        };

        let active = Arc::clone(&self.active);
        let task = tokio::spawn(async move {
            let summary = scan.run(job_events).await;
            active.lock().await.remove(&id);
            summary
        });

        Ok(ScanSession {
            events: events_rx,
            task,
        })
    }

    /// Cancels every active scan.
    ///
    /// No new files are probed or submitted; returns once every conversion
    /// process of those scans has been terminated.
    pub async fn cancel_scan(&self) {
        let scans: Vec<Arc<ScanControl>> = self.active.lock().await.values().cloned().collect();
        if scans.is_empty() {
            return;
        }

        info!(count = scans.len(), "Cancelling scans");
        for scan in &scans {
            scan.cancel.send_replace(true);
        }
        join_all(scans.iter().map(|scan| scan.supervisor.cancel_all())).await;
    }

    /// Cancels every active scan and refuses new ones.
    pub async fn shutdown(&self) {
        {
            let _active = self.active.lock().await;
            self.closed.store(true, Ordering::SeqCst);
        }
        self.cancel_scan().await;
        info!("Scan orchestrator shut down");
    }

    /// Number of scans still running.
    pub async fn active_scans(&self) -> usize {
        self.active.lock().await.len()
    }
}

async fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let invalid = |reason: String| ScanError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let canonical = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }

    Ok(canonical)
}

/// A running scan, as seen by the caller.
pub struct ScanSession {
    events: mpsc::UnboundedReceiver<ScanEvent>,
    task: JoinHandle<ScanSummary>,
}

impl ScanSession {
    /// Next live event, or `None` once the scan has finished.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Waits for the scan to complete and returns its summary.
    ///
    /// Events not yet read are discarded.
    pub async fn finish(self) -> Result<ScanSummary, ScanError> {
        self.task
            .await
            .map_err(|e| ScanError::Aborted(e.to_string()))
    }
}

/// State owned by one scan's control task.
struct ScanRun {
    root: PathBuf,
    convert_unsupported: bool,
    follow_links: bool,
    profile: TargetProfile,
    encode: EncodeConfig,
    prober: Arc<dyn MediaProber>,
    control: Arc<ScanControl>,
    cancel: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<ScanEvent>,
    tally: ScanTally,
    own_outputs: HashSet<PathBuf>,
    pending_jobs: usize,
}

impl ScanRun {
    async fn run(mut self, mut job_events: SupervisorEvents) -> ScanSummary {
        info!(
            root = %self.root.display(),
            convert = self.convert_unsupported,
            "Scan started"
        );

        let (path_tx, mut path_rx) = mpsc::channel(WALK_BUFFER_SIZE);
        let walker = spawn_walker(self.root.clone(), self.follow_links, path_tx);
        let mut cancel = self.cancel.clone();
        let mut walking = true;
        let mut cancelled = false;

        while walking || self.pending_jobs > 0 {
            tokio::select! {
                biased;

                // The borrowed value must not live across process_file
                Ok(()) = async { cancel.wait_for(|c| *c).await.map(|_| ()) }, if !cancelled => {
                    info!(root = %self.root.display(), "Scan cancelled");
                    cancelled = true;
                    walking = false;
                }

                event = job_events.recv() => match event {
                    Some(event) => self.handle_job_event(event),
                    None => break,
                },

                path = path_rx.recv(), if walking => match path {
                    Some(path) => self.process_file(path).await,
                    None => walking = false,
                },
            }
        }

        drop(path_rx);
        if let Err(e) = walker.await {
            warn!(error = %e, "Walker task ended abnormally");
        }

        let summary = self.tally.finish(cancelled);
        info!(
            root = %summary.root.display(),
            supported = summary.supported.len(),
            unsupported = summary.unsupported.len(),
            unreadable = summary.unreadable.len(),
            conversions = summary.conversions.len(),
            cancelled = summary.cancelled,
            "Scan finished"
        );
        summary
    }

    async fn process_file(&mut self, path: PathBuf) {
        if self.own_outputs.contains(&path) {
            debug!(path = %path.display(), "Skipping output of this scan");
            return;
        }

        self.emit(ScanEvent::Discovered { path: path.clone() });

        let probed = self.prober.probe(&path).await;
        let result = self.profile.classify(probed);
        debug!(path = %path.display(), kind = ?result.kind(), "Classified");
        self.tally.record(&result);

        let to_convert = match &result {
            ClassificationResult::Unsupported(file) if self.convert_unsupported => {
                Some(file.clone())
            }
            _ => None,
        };
        self.emit(ScanEvent::Classified(result));

        if let Some(file) = to_convert {
            self.submit(file).await;
        }
    }

    async fn submit(&mut self, file: MediaFile) {
        if *self.cancel.borrow() {
            return;
        }

        let job = ConversionJob::new(file, &self.encode);
        let source = job.source_path().to_path_buf();
        let output_path = job.output_path().to_path_buf();

        // A file already at the output path belongs to the library, unless
        // this job is allowed to replace it.
        let writes_output = job.overwrite()
            || !tokio::fs::try_exists(&output_path).await.unwrap_or(true);

        match self.control.supervisor.submit(job).await {
            Ok(_) => {
                if writes_output {
                    self.own_outputs.insert(output_path);
                }
                self.pending_jobs += 1;
            }
            Err(SupervisorError::Closed) => {
                // Lost a race with cancel_scan
                self.record_unsubmitted(
                    source,
                    output_path,
                    JobState::Cancelled,
                    ConversionError::Cancelled,
                );
            }
            Err(SupervisorError::OutputClaimed(path)) => {
                self.record_unsubmitted(
                    source,
                    output_path,
                    JobState::Failed,
                    ConversionError::AlreadyExists { path },
                );
            }
            Err(e) => warn!(source = %source.display(), error = %e, "Conversion not submitted"),
        }
    }

    fn record_unsubmitted(
        &mut self,
        source: PathBuf,
        output_path: PathBuf,
        state: JobState,
        error: ConversionError,
    ) {
        debug!(source = %source.display(), ?state, error = %error, "Conversion not submitted");
        let outcome = JobOutcome {
            source,
            output_path,
            state,
            error: Some(error),
            duration_ms: 0,
        };
        self.tally.record_outcome(outcome.clone());
        self.emit(ScanEvent::ConversionDone(outcome));
    }

    fn handle_job_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Started {
                source,
                output_path,
            } => self.emit(ScanEvent::ConversionStarted {
                source,
                output_path,
            }),
            JobEvent::Progress(progress) => self.emit(ScanEvent::ConversionProgress(progress)),
            JobEvent::Finished(outcome) => {
                self.pending_jobs = self.pending_jobs.saturating_sub(1);
                self.tally.record_outcome(outcome.clone());
                self.emit(ScanEvent::ConversionDone(outcome));
            }
        }
    }

    fn emit(&self, event: ScanEvent) {
        // The caller may have stopped listening
        let _ = self.events.send(event);
    }
}
