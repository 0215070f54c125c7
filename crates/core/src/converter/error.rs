//! Error types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Why a conversion job did not succeed.
///
/// Errors are plain data so they can be stored in summaries and serialized.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionError {
    /// The encoder process could not be spawned.
    #[error("Failed to start encoder: {reason}")]
    ProcessStartFailed { reason: String },

    /// The encoder exited with a non-zero status.
    #[error("Encoder exited with code {code:?}")]
    ProcessExitedNonZero {
        code: Option<i32>,
        /// Last lines of encoder output.
        diagnostic: String,
    },

    /// The encoder exited successfully without producing the output file.
    #[error("Encoder reported success but output is missing: {}", path.display())]
    OutputMissing { path: PathBuf },

    /// The output file exists and overwriting was not requested.
    #[error("Output file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// The output path is the source path.
    #[error("Output path is the source file: {}", path.display())]
    OutputIsSource { path: PathBuf },

    /// The source duration could not be determined, so progress is unknowable.
    #[error("Unknown source duration: {reason}")]
    DurationUnknown { reason: String },

    /// I/O error while supervising the encoder.
    #[error("I/O error: {reason}")]
    Io { reason: String },

    /// Job was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    /// Creates an I/O error from a std error.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }

    /// Diagnostic output captured from the encoder, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ProcessExitedNonZero { diagnostic, .. } if !diagnostic.is_empty() => {
                Some(diagnostic)
            }
            _ => None,
        }
    }
}
