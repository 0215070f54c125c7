//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::ConversionError;

/// Lifecycle state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted, waiting for a slot.
    Pending,
    /// The encoder process is running.
    Running,
    /// The encoder exited cleanly and the output exists.
    Succeeded,
    /// The job ended with an error.
    Failed,
    /// The job was cancelled.
    Cancelled,
}

impl JobState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// `Running -> Running` is allowed for progress updates.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Failed | Self::Cancelled) => true,
            (Self::Running, Self::Running) => true,
            (Self::Running, s) => s.is_terminal(),
            _ => false,
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Current state.
    pub state: JobState,
    /// Progress in percent, 0 to 100.
    pub progress_percent: f32,
    /// Encoder process id while it runs.
    pub pid: Option<u32>,
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self {
            state: JobState::Pending,
            progress_percent: 0.0,
            pid: None,
        }
    }
}

/// Progress update of a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Source file being converted.
    pub source: PathBuf,
    /// Progress percentage (0-100).
    pub percent: f32,
    /// Elapsed encode time in seconds.
    pub elapsed_secs: f64,
    /// Total source duration in seconds.
    pub duration_secs: f64,
}

/// Terminal result of a conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Source file.
    pub source: PathBuf,
    /// Output file (present on disk only if the job succeeded).
    pub output_path: PathBuf,
    /// Terminal state.
    pub state: JobState,
    /// Error for failed and cancelled jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConversionError>,
    /// Wall-clock time spent running, excluding time queued for a slot.
    pub duration_ms: u64,
}

impl JobOutcome {
    /// Whether the job produced its output.
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// Events emitted while jobs run, in the order they happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// The encoder process was spawned.
    Started { source: PathBuf, output_path: PathBuf },
    /// Progress grew.
    Progress(ConversionProgress),
    /// The job reached a terminal state.
    Finished(JobOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        use JobState::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Failed));
        assert!(Running.can_transition_to(Running));
        assert!(Running.can_transition_to(Succeeded));
        assert!(Running.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Succeeded));
        assert!(!Running.can_transition_to(Pending));
        for terminal in [Succeeded, Failed, Cancelled] {
            for next in [Pending, Running, Succeeded, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_outcome_serialization_skips_missing_error() {
        let outcome = JobOutcome {
            source: PathBuf::from("/a.mkv"),
            output_path: PathBuf::from("/a_ps3.mp4"),
            state: JobState::Succeeded,
            error: None,
            duration_ms: 10,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert!(json.get("error").is_none());
    }
}
