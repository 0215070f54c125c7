//! A single supervised encoder invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::command::{build_encode_args, output_path_for};
use super::error::ConversionError;
use super::process::{spawn_line_reader, terminate};
use super::progress::{OutputTail, ProgressTracker};
use super::types::{ConversionProgress, JobEvent, JobOutcome, JobSnapshot, JobState};
use crate::config::{Config, EncodeConfig};
use crate::media::{MediaFile, MediaProber};
use crate::profile::TargetProfile;

/// Buffer size of the merged output line channel.
const LINE_BUFFER_SIZE: usize = 256;

/// A request to convert one file.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    source: MediaFile,
    output_path: PathBuf,
    overwrite: bool,
}

impl ConversionJob {
    /// Creates a job writing to the default output path for `source`.
    pub fn new(source: MediaFile, encode: &EncodeConfig) -> Self {
        let output_path = output_path_for(&source.path, encode);
        Self {
            source,
            output_path,
            overwrite: encode.overwrite,
        }
    }

    /// Overrides the output path.
    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    /// Allows replacing an existing output file.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Source file.
    pub fn source(&self) -> &MediaFile {
        &self.source
    }

    /// Source path, the identity of the job.
    pub fn source_path(&self) -> &Path {
        &self.source.path
    }

    /// Where the converted file is written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Whether an existing output may be replaced.
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Runs the job to a terminal state.
    pub(crate) async fn run(self, ctx: &JobContext, control: JobControl) -> JobOutcome {
        let started = Instant::now();
        let result = self.execute(ctx, &control).await;

        let (state, error) = match result {
            Ok(()) => (JobState::Succeeded, None),
            Err(ConversionError::Cancelled) => {
                (JobState::Cancelled, Some(ConversionError::Cancelled))
            }
            Err(e) => (JobState::Failed, Some(e)),
        };
        control.finish(state);

        let source = self.source.path.display();
        match &error {
            None => info!(
                source = %source,
                output = %self.output_path.display(),
                "Conversion succeeded"
            ),
            Some(ConversionError::Cancelled) => info!(source = %source, "Conversion cancelled"),
            Some(e) => warn!(source = %source, error = %e, "Conversion failed"),
        }

        JobOutcome {
            source: self.source.path,
            output_path: self.output_path,
            state,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Settles a job that was cancelled while still waiting for a slot.
    pub(crate) fn cancel_before_start(self, control: &JobControl) -> JobOutcome {
        control.finish(JobState::Cancelled);
        debug!(source = %self.source.path.display(), "Queued conversion cancelled");

        JobOutcome {
            source: self.source.path,
            output_path: self.output_path,
            state: JobState::Cancelled,
            error: Some(ConversionError::Cancelled),
            duration_ms: 0,
        }
    }

    async fn execute(&self, ctx: &JobContext, control: &JobControl) -> Result<(), ConversionError> {
        let source = &self.source.path;

        if self.output_path == *source {
            return Err(ConversionError::OutputIsSource {
                path: self.output_path.clone(),
            });
        }

        let output_exists = tokio::fs::try_exists(&self.output_path)
            .await
            .map_err(ConversionError::io)?;
        if output_exists && !self.overwrite {
            return Err(ConversionError::AlreadyExists {
                path: self.output_path.clone(),
            });
        }

        if control.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let duration_secs = ctx
            .prober
            .duration(source)
            .await
            .map_err(|e| ConversionError::DurationUnknown { reason: e.reason })?;
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ConversionError::DurationUnknown {
                reason: format!("invalid duration {}", duration_secs),
            });
        }

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ConversionError::io)?;
            }
        }

        self.claim_output().await?;

        // From here on the output path belongs to this job, so the encoder
        // may replace the placeholder.
        let args = build_encode_args(source, &self.output_path, true, &ctx.encode, &ctx.profile);
        debug!(ffmpeg = %ctx.ffmpeg_path.display(), ?args, "Spawning encoder");

        let child = Command::new(&ctx.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                self.remove_partial_output().await;
                return Err(ConversionError::ProcessStartFailed {
                    reason: format!("{}: {}", ctx.ffmpeg_path.display(), e),
                });
            }
        };

        control.start(child.id());
        control.emit(JobEvent::Started {
            source: source.clone(),
            output_path: self.output_path.clone(),
        });
        info!(source = %source.display(), pid = ?child.id(), "Encoder started");

        let (line_tx, mut line_rx) = mpsc::channel(LINE_BUFFER_SIZE);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, line_tx.clone()));
        }
        drop(line_tx);

        let mut tracker = ProgressTracker::new(duration_secs);
        let mut tail = OutputTail::new(ctx.encode.diagnostic_lines);
        let mut cancel = control.cancel.clone();

        // Consume output until both streams close
        let cancelled = loop {
            tokio::select! {
                Ok(_) = cancel.wait_for(|c| *c) => break true,
                line = line_rx.recv() => match line {
                    Some(line) => {
                        if let Some(percent) = tracker.observe(&line) {
                            control.progress(source, &tracker, percent);
                        }
                        tail.push(&line);
                    }
                    None => break false,
                },
            }
        };

        let status = if cancelled {
            None
        } else {
            tokio::select! {
                Ok(_) = cancel.wait_for(|c| *c) => None,
                status = child.wait() => Some(status),
            }
        };

        let Some(status) = status else {
            terminate(&mut child, ctx.cancel_grace).await;
            for reader in &readers {
                reader.abort();
            }
            self.remove_partial_output().await;
            return Err(ConversionError::Cancelled);
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                self.remove_partial_output().await;
                return Err(ConversionError::io(e));
            }
        };

        if !status.success() {
            self.remove_partial_output().await;
            return Err(ConversionError::ProcessExitedNonZero {
                code: status.code(),
                diagnostic: tail.render(),
            });
        }

        // An empty file is the placeholder left by claim_output
        let produced = match tokio::fs::metadata(&self.output_path).await {
            Ok(metadata) => metadata.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(ConversionError::io(e)),
        };
        if !produced {
            self.remove_partial_output().await;
            return Err(ConversionError::OutputMissing {
                path: self.output_path.clone(),
            });
        }

        let percent = tracker.complete();
        control.progress(source, &tracker, percent);
        Ok(())
    }

    /// Reserves the output path before the encoder is spawned.
    ///
    /// Without overwrite the file is created exclusively, so a job never
    /// writes to (or cleans up) a file it did not create.
    async fn claim_output(&self) -> Result<(), ConversionError> {
        if self.overwrite {
            return Ok(());
        }

        let claimed = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.output_path)
            .await;
        match claimed {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ConversionError::AlreadyExists {
                    path: self.output_path.clone(),
                })
            }
            Err(e) => Err(ConversionError::io(e)),
        }
    }

    async fn remove_partial_output(&self) {
        match tokio::fs::remove_file(&self.output_path).await {
            Ok(()) => debug!(output = %self.output_path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                output = %self.output_path.display(),
                error = %e,
                "Failed to remove partial output"
            ),
        }
    }
}

/// Everything a job needs to run, shared by all jobs of a supervisor.
pub(crate) struct JobContext {
    pub ffmpeg_path: PathBuf,
    pub encode: EncodeConfig,
    pub profile: TargetProfile,
    pub cancel_grace: Duration,
    pub prober: Arc<dyn MediaProber>,
}

impl JobContext {
    pub fn new(config: &Config, prober: Arc<dyn MediaProber>) -> Self {
        Self {
            ffmpeg_path: config.tools.ffmpeg_path.clone(),
            encode: config.encode.clone(),
            profile: config.profile.clone(),
            cancel_grace: Duration::from_secs(config.supervisor.cancel_grace_secs),
            prober,
        }
    }
}

/// The job side of the channels connecting a job to its observers.
pub(crate) struct JobControl {
    pub state: watch::Sender<JobSnapshot>,
    pub cancel: watch::Receiver<bool>,
    pub events: mpsc::UnboundedSender<JobEvent>,
}

impl JobControl {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn transition(&self, next: JobState, pid: Option<u32>) {
        self.state.send_if_modified(|snapshot| {
            if !snapshot.state.can_transition_to(next) {
                return false;
            }
            snapshot.state = next;
            snapshot.pid = pid;
            true
        });
    }

    fn start(&self, pid: Option<u32>) {
        self.transition(JobState::Running, pid);
    }

    fn finish(&self, state: JobState) {
        self.transition(state, None);
    }

    fn progress(&self, source: &Path, tracker: &ProgressTracker, percent: f32) {
        let grew = self.state.send_if_modified(|snapshot| {
            if snapshot.state != JobState::Running || percent <= snapshot.progress_percent {
                return false;
            }
            snapshot.progress_percent = percent;
            true
        });

        if grew {
            self.emit(JobEvent::Progress(ConversionProgress {
                source: source.to_path_buf(),
                percent,
                elapsed_secs: tracker.elapsed_secs(),
                duration_secs: tracker.duration_secs(),
            }));
        }
    }

    fn emit(&self, event: JobEvent) {
        // The supervisor may already be gone during shutdown
        let _ = self.events.send(event);
    }
}
