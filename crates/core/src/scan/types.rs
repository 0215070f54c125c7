//! Types for the scan module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::{ConversionProgress, JobOutcome, JobState};
use crate::media::ClassificationResult;

/// Live notification from a running scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// The walker found a regular file.
    Discovered { path: PathBuf },
    /// A file was probed and classified.
    Classified(ClassificationResult),
    /// An encoder process was spawned for a file.
    ConversionStarted { source: PathBuf, output_path: PathBuf },
    /// A running conversion advanced.
    ConversionProgress(ConversionProgress),
    /// A conversion reached a terminal state.
    ConversionDone(JobOutcome),
}

/// A file that could not be probed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Final report of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Compatible files, in traversal order.
    pub supported: Vec<PathBuf>,
    /// Incompatible files, in traversal order.
    pub unsupported: Vec<PathBuf>,
    /// Files that could not be probed, in traversal order.
    pub unreadable: Vec<UnreadableFile>,
    /// Conversion outcomes, in completion order.
    pub conversions: Vec<JobOutcome>,
    /// Whether the scan was cancelled before completing.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanSummary {
    /// Number of files that were classified.
    pub fn total_classified(&self) -> usize {
        self.supported.len() + self.unsupported.len() + self.unreadable.len()
    }

    /// Number of conversions that ended in the given state.
    pub fn conversions_in(&self, state: JobState) -> usize {
        self.conversions.iter().filter(|o| o.state == state).count()
    }
}

/// Running totals of a scan in progress.
#[derive(Debug)]
pub(crate) struct ScanTally {
    root: PathBuf,
    started_at: DateTime<Utc>,
    supported: Vec<PathBuf>,
    unsupported: Vec<PathBuf>,
    unreadable: Vec<UnreadableFile>,
    conversions: Vec<JobOutcome>,
}

impl ScanTally {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            started_at: Utc::now(),
            supported: Vec::new(),
            unsupported: Vec::new(),
            unreadable: Vec::new(),
            conversions: Vec::new(),
        }
    }

    pub fn record(&mut self, result: &ClassificationResult) {
        match result {
            ClassificationResult::Supported(file) => self.supported.push(file.path.clone()),
            ClassificationResult::Unsupported(file) => self.unsupported.push(file.path.clone()),
            ClassificationResult::Unreadable { file, reason } => {
                self.unreadable.push(UnreadableFile {
                    path: file.path.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }

    pub fn record_outcome(&mut self, outcome: JobOutcome) {
        self.conversions.push(outcome);
    }

    pub fn finish(self, cancelled: bool) -> ScanSummary {
        ScanSummary {
            root: self.root,
            supported: self.supported,
            unsupported: self.unsupported,
            unreadable: self.unreadable,
            conversions: self.conversions,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionError;
    use crate::media::MediaFile;

    #[test]
    fn test_tally_partitions_results() {
        let mut tally = ScanTally::new(PathBuf::from("/videos"));
        tally.record(&ClassificationResult::Supported(MediaFile::unprobed("/videos/a.mp4")));
        tally.record(&ClassificationResult::Unsupported(MediaFile::unprobed("/videos/b.mkv")));
        tally.record(&ClassificationResult::Unreadable {
            file: MediaFile::unprobed("/videos/c.txt"),
            reason: "no video stream".to_string(),
        });
        tally.record_outcome(JobOutcome {
            source: PathBuf::from("/videos/b.mkv"),
            output_path: PathBuf::from("/videos/b_ps3.mp4"),
            state: JobState::Cancelled,
            error: Some(ConversionError::Cancelled),
            duration_ms: 5,
        });

        let summary = tally.finish(true);
        assert_eq!(summary.total_classified(), 3);
        assert_eq!(summary.supported, vec![PathBuf::from("/videos/a.mp4")]);
        assert_eq!(summary.unsupported, vec![PathBuf::from("/videos/b.mkv")]);
        assert_eq!(summary.unreadable[0].reason, "no video stream");
        assert_eq!(summary.conversions_in(JobState::Cancelled), 1);
        assert_eq!(summary.conversions_in(JobState::Succeeded), 0);
        assert!(summary.cancelled);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let summary = ScanTally::new(PathBuf::from("/videos")).finish(false);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["root"], "/videos");
        assert_eq!(json["cancelled"], false);
        assert!(json["unreadable"].as_array().unwrap().is_empty());
    }
}
