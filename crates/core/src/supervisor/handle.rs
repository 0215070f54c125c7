//! Caller-side view of a submitted job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::converter::{JobSnapshot, JobState};

/// Handle to a job owned by a `JobSupervisor`.
///
/// The handle can observe the job and request cancellation; it never touches
/// the encoder process itself.
#[derive(Debug, Clone)]
pub struct JobHandle {
    source: PathBuf,
    output_path: PathBuf,
    state: watch::Receiver<JobSnapshot>,
    cancel: Arc<watch::Sender<bool>>,
}

impl JobHandle {
    pub(crate) fn new(
        source: PathBuf,
        output_path: PathBuf,
        state: watch::Receiver<JobSnapshot>,
        cancel: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            source,
            output_path,
            state,
            cancel,
        }
    }

    /// Source file of the job.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Output file of the job.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        self.state.borrow().clone()
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state.borrow().state
    }

    /// Waits for the job to reach a terminal state.
    pub async fn wait(&self) -> JobSnapshot {
        let mut state = self.state.clone();
        // The final value stays readable after the job drops its sender
        let result = state
            .wait_for(|s| s.state.is_terminal())
            .await
            .map(|s| (*s).clone());
        result.unwrap_or_else(|_| state.borrow().clone())
    }

    /// Cancels the job and waits until it is terminal.
    ///
    /// Cancelling a job that already finished is a no-op.
    pub async fn cancel(&self) -> JobSnapshot {
        if !self.state().is_terminal() {
            self.cancel.send_replace(true);
        }
        self.wait().await
    }
}
