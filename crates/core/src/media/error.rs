//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

/// A probe failed for any reason.
///
/// Inspector failures are never partially trusted: a missing stream is as much
/// a failure as a crashed process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to probe {}: {reason}", path.display())]
pub struct ProbeError {
    /// File that was being probed.
    pub path: PathBuf,
    /// Diagnostic describing what went wrong.
    pub reason: String,
}

impl ProbeError {
    /// Creates a new probe error for the given path.
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            path: path.into(),
            reason: if reason.trim().is_empty() {
                "unknown inspector failure".to_string()
            } else {
                reason
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_never_empty() {
        let err = ProbeError::new("/a.mp4", "   ");
        assert_eq!(err.reason, "unknown inspector failure");
    }

    #[test]
    fn test_display_includes_path() {
        let err = ProbeError::new("/videos/a.mp4", "ffprobe exited with code 1");
        let text = err.to_string();
        assert!(text.contains("/videos/a.mp4"));
        assert!(text.contains("code 1"));
    }
}
