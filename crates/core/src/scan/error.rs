//! Error types for the scan module.

use std::path::PathBuf;
use thiserror::Error;

/// Call-level failures of a scan.
///
/// Per-file and per-job failures never surface here; they are recorded in
/// the `ScanSummary`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The root does not exist or is not a directory.
    #[error("Invalid scan root {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    /// `shutdown` was called on the orchestrator.
    #[error("Orchestrator is shut down")]
    Closed,

    /// The scan task ended without producing a summary.
    #[error("Scan aborted: {0}")]
    Aborted(String),
}
