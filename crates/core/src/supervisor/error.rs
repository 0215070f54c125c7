//! Error types for the supervisor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously by `JobSupervisor::submit`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    /// `cancel_all` was called; no more jobs are accepted.
    #[error("Supervisor is closed")]
    Closed,

    /// A job for this source is still active.
    #[error("A job is already active for: {}", .0.display())]
    DuplicateJob(PathBuf),

    /// An active job is already writing to this output path.
    #[error("Output is already claimed by an active job: {}", .0.display())]
    OutputClaimed(PathBuf),
}
