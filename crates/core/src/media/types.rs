//! Types for the media module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Codec and resolution metadata of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Lowercased extension without the dot, empty if the file has none.
    pub extension: String,
    /// Codec name of the first video stream.
    pub video_codec: Option<String>,
    /// Codec name of the first audio stream.
    pub audio_codec: Option<String>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
}

impl MediaFile {
    /// Creates a file record that carries no probed metadata yet.
    pub fn unprobed(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            video_codec: None,
            audio_codec: None,
            width: None,
            height: None,
        }
    }

    /// Returns `(width, height)` if both are known.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    /// Formats the resolution as `WxH`, or `?` when unknown.
    pub fn resolution_label(&self) -> String {
        match self.resolution() {
            Some((w, h)) => format!("{}x{}", w, h),
            None => "?".to_string(),
        }
    }
}

/// Lowercased extension of a path, without the dot.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Outcome of classifying one file against a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationResult {
    /// The file plays on the target device as-is.
    Supported(MediaFile),
    /// The file was probed but violates the profile.
    Unsupported(MediaFile),
    /// The file could not be probed.
    Unreadable {
        /// The file, without probed metadata.
        file: MediaFile,
        /// Why probing failed.
        reason: String,
    },
}

/// Bucket a classification falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    Supported,
    Unsupported,
    Unreadable,
}

impl ClassificationResult {
    /// The file this result is about.
    pub fn file(&self) -> &MediaFile {
        match self {
            Self::Supported(file) | Self::Unsupported(file) => file,
            Self::Unreadable { file, .. } => file,
        }
    }

    /// Path of the classified file.
    pub fn path(&self) -> &Path {
        &self.file().path
    }

    /// Which bucket this result belongs to.
    pub fn kind(&self) -> ClassificationKind {
        match self {
            Self::Supported(_) => ClassificationKind::Supported,
            Self::Unsupported(_) => ClassificationKind::Unsupported,
            Self::Unreadable { .. } => ClassificationKind::Unreadable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprobed_lowercases_extension() {
        let file = MediaFile::unprobed("/videos/Movie.MP4");
        assert_eq!(file.extension, "mp4");
        assert!(file.video_codec.is_none());
        assert!(file.resolution().is_none());
    }

    #[test]
    fn test_unprobed_without_extension() {
        let file = MediaFile::unprobed("/videos/README");
        assert_eq!(file.extension, "");
    }

    #[test]
    fn test_resolution_requires_both_dimensions() {
        let mut file = MediaFile::unprobed("/a.mp4");
        file.width = Some(1280);
        assert!(file.resolution().is_none());
        assert_eq!(file.resolution_label(), "?");

        file.height = Some(720);
        assert_eq!(file.resolution(), Some((1280, 720)));
        assert_eq!(file.resolution_label(), "1280x720");
    }

    #[test]
    fn test_classification_accessors() {
        let file = MediaFile::unprobed("/a.mkv");
        let result = ClassificationResult::Unreadable {
            file: file.clone(),
            reason: "bad".to_string(),
        };
        assert_eq!(result.kind(), ClassificationKind::Unreadable);
        assert_eq!(result.path(), Path::new("/a.mkv"));
        assert_eq!(result.file(), &file);
    }

    #[test]
    fn test_classification_serialization() {
        let result = ClassificationResult::Supported(MediaFile::unprobed("/a.mp4"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "supported");
        assert_eq!(json["extension"], "mp4");
    }
}
