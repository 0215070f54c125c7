//! The compatibility rule.

use serde::{Deserialize, Serialize};

use crate::media::{ClassificationResult, MediaFile, ProbeError};

/// Codecs, containers and resolution a playback device accepts.
///
/// All conditions are conjunctive and comparisons are case-insensitive. Any
/// missing field makes a file incompatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Human readable profile name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Accepted file extensions, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Accepted codec names for the first video stream.
    #[serde(default = "default_video_codecs")]
    pub video_codecs: Vec<String>,

    /// Accepted codec names for the first audio stream.
    #[serde(default = "default_audio_codecs")]
    pub audio_codecs: Vec<String>,

    /// Maximum video width in pixels.
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum video height in pixels.
    #[serde(default = "default_max_height")]
    pub max_height: u32,
}

fn default_name() -> String {
    "ps3".to_string()
}

fn default_extensions() -> Vec<String> {
    ["mp4", "avi", "mpeg", "m2ts"].map(String::from).to_vec()
}

fn default_video_codecs() -> Vec<String> {
    ["h264", "mpeg4"].map(String::from).to_vec()
}

fn default_audio_codecs() -> Vec<String> {
    vec!["aac".to_string()]
}

fn default_max_width() -> u32 {
    1920
}

fn default_max_height() -> u32 {
    1080
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            extensions: default_extensions(),
            video_codecs: default_video_codecs(),
            audio_codecs: default_audio_codecs(),
            max_width: default_max_width(),
            max_height: default_max_height(),
        }
    }
}

fn contains_ignore_case(allowed: &[String], value: &str) -> bool {
    let value = value.trim().trim_start_matches('.');
    allowed
        .iter()
        .any(|a| a.trim().trim_start_matches('.').eq_ignore_ascii_case(value))
}

impl TargetProfile {
    /// Decides whether a file with these properties plays on the device.
    pub fn is_compatible(
        &self,
        extension: Option<&str>,
        video_codec: Option<&str>,
        audio_codec: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> bool {
        let (Some(extension), Some(video), Some(audio), Some(width), Some(height)) =
            (extension, video_codec, audio_codec, width, height)
        else {
            return false;
        };

        if extension.is_empty() || video.is_empty() || audio.is_empty() {
            return false;
        }

        contains_ignore_case(&self.extensions, extension)
            && contains_ignore_case(&self.video_codecs, video)
            && contains_ignore_case(&self.audio_codecs, audio)
            && width <= self.max_width
            && height <= self.max_height
    }

    /// `is_compatible` applied to a probed file.
    pub fn is_compatible_file(&self, file: &MediaFile) -> bool {
        self.is_compatible(
            Some(file.extension.as_str()),
            file.video_codec.as_deref(),
            file.audio_codec.as_deref(),
            file.width,
            file.height,
        )
    }

    /// Turns a probe result into a classification.
    pub fn classify(&self, probed: Result<MediaFile, ProbeError>) -> ClassificationResult {
        match probed {
            Ok(file) if self.is_compatible_file(&file) => ClassificationResult::Supported(file),
            Ok(file) => ClassificationResult::Unsupported(file),
            Err(err) => ClassificationResult::Unreadable {
                file: MediaFile::unprobed(err.path.clone()),
                reason: err.reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ClassificationKind;

    fn media(ext: &str, video: &str, audio: &str, w: u32, h: u32) -> MediaFile {
        MediaFile {
            path: format!("/videos/file.{}", ext).into(),
            extension: ext.to_string(),
            video_codec: Some(video.to_string()),
            audio_codec: Some(audio.to_string()),
            width: Some(w),
            height: Some(h),
        }
    }

    #[test]
    fn test_default_profile_accepts_ps3_file() {
        let profile = TargetProfile::default();
        assert!(profile.is_compatible(Some("mp4"), Some("h264"), Some("aac"), Some(1280), Some(720)));
        assert!(profile.is_compatible(Some("avi"), Some("mpeg4"), Some("aac"), Some(1920), Some(1080)));
    }

    #[test]
    fn test_comparisons_are_case_insensitive() {
        let profile = TargetProfile::default();
        assert!(profile.is_compatible(Some("MP4"), Some("H264"), Some("AAC"), Some(640), Some(480)));
    }

    #[test]
    fn test_extension_gate() {
        let profile = TargetProfile::default();
        for ext in ["mkv", "mov", "webm", "ts", "", "txt"] {
            for (w, h) in [(320, 240), (1920, 1080)] {
                assert!(
                    !profile.is_compatible(Some(ext), Some("h264"), Some("aac"), Some(w), Some(h)),
                    "extension {:?} must be rejected",
                    ext
                );
            }
        }
    }

    #[test]
    fn test_fails_closed_on_missing_fields() {
        let profile = TargetProfile::default();
        let full = (Some("mp4"), Some("h264"), Some("aac"), Some(1280u32), Some(720u32));
        assert!(profile.is_compatible(full.0, full.1, full.2, full.3, full.4));

        assert!(!profile.is_compatible(None, full.1, full.2, full.3, full.4));
        assert!(!profile.is_compatible(full.0, None, full.2, full.3, full.4));
        assert!(!profile.is_compatible(full.0, full.1, None, full.3, full.4));
        assert!(!profile.is_compatible(full.0, full.1, full.2, None, full.4));
        assert!(!profile.is_compatible(full.0, full.1, full.2, full.3, None));
    }

    #[test]
    fn test_rejects_wrong_codecs() {
        let profile = TargetProfile::default();
        assert!(!profile.is_compatible(Some("mp4"), Some("hevc"), Some("aac"), Some(1920), Some(1080)));
        assert!(!profile.is_compatible(Some("mp4"), Some("h264"), Some("ac3"), Some(1920), Some(1080)));
    }

    #[test]
    fn test_rejects_oversized_resolution() {
        let profile = TargetProfile::default();
        assert!(!profile.is_compatible(Some("mp4"), Some("h264"), Some("aac"), Some(3840), Some(2160)));
        assert!(!profile.is_compatible(Some("mp4"), Some("h264"), Some("aac"), Some(1920), Some(1088)));
    }

    #[test]
    fn test_custom_profile_allow_list() {
        let profile = TargetProfile {
            video_codecs: vec!["h264".to_string()],
            extensions: vec![".mkv".to_string()],
            ..Default::default()
        };
        assert!(profile.is_compatible(Some("mkv"), Some("h264"), Some("aac"), Some(1280), Some(720)));
        assert!(!profile.is_compatible(Some("mkv"), Some("mpeg4"), Some("aac"), Some(1280), Some(720)));
    }

    #[test]
    fn test_classify() {
        let profile = TargetProfile::default();

        let supported = profile.classify(Ok(media("mp4", "h264", "aac", 1280, 720)));
        assert_eq!(supported.kind(), ClassificationKind::Supported);

        let unsupported = profile.classify(Ok(media("mp4", "hevc", "aac", 1920, 1080)));
        assert_eq!(unsupported.kind(), ClassificationKind::Unsupported);

        let unreadable = profile.classify(Err(ProbeError::new("/videos/broken.mp4", "moov atom not found")));
        match unreadable {
            ClassificationResult::Unreadable { file, reason } => {
                assert_eq!(file.extension, "mp4");
                assert_eq!(reason, "moov atom not found");
            }
            other => panic!("expected unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_partial_profile() {
        let profile: TargetProfile = toml::from_str(
            r#"
name = "strict"
video_codecs = ["h264"]
"#,
        )
        .unwrap();
        assert_eq!(profile.name, "strict");
        assert_eq!(profile.video_codecs, vec!["h264".to_string()]);
        assert_eq!(profile.extensions, default_extensions());
        assert_eq!(profile.max_width, 1920);
    }
}
