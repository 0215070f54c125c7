use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::profile::TargetProfile;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub profile: TargetProfile,
    #[serde(default)]
    pub encode: EncodeConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// External tool locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    /// Upper bound for a single ffprobe invocation.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_probe_timeout() -> u64 {
    30
}

/// Encoding parameters for converted files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodeConfig {
    /// ffmpeg video encoder.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    /// H.264 profile passed as `-profile:v`.
    #[serde(default = "default_video_profile")]
    pub video_profile: String,
    /// H.264 level passed as `-level:v`.
    #[serde(default = "default_video_level")]
    pub video_level: String,
    /// Target video bitrate in kbps.
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate_kbps: u32,
    /// ffmpeg audio encoder.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Target audio bitrate in kbps.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
    /// Extension of converted files.
    #[serde(default = "default_container")]
    pub container: String,
    /// Appended to the source stem: `<stem>_<suffix>.<container>`.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
    /// Write converted files here instead of next to the source.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Replace existing output files.
    #[serde(default)]
    pub overwrite: bool,
    /// ffmpeg log level.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
    /// Additional ffmpeg arguments placed before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
    /// Output lines kept for failure diagnostics.
    #[serde(default = "default_diagnostic_lines")]
    pub diagnostic_lines: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            video_profile: default_video_profile(),
            video_level: default_video_level(),
            video_bitrate_kbps: default_video_bitrate(),
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
            container: default_container(),
            output_suffix: default_output_suffix(),
            output_dir: None,
            overwrite: false,
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            diagnostic_lines: default_diagnostic_lines(),
        }
    }
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_video_profile() -> String {
    "high".to_string()
}

fn default_video_level() -> String {
    "4.1".to_string()
}

fn default_video_bitrate() -> u32 {
    5000
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> u32 {
    192
}

fn default_container() -> String {
    "mp4".to_string()
}

fn default_output_suffix() -> String {
    "ps3".to_string()
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_diagnostic_lines() -> usize {
    20
}

/// Conversion job supervision
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupervisorConfig {
    /// Maximum encodes running at the same time.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_jobs: usize,
    /// How long a cancelled encoder may take to exit before it is killed.
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: default_max_parallel(),
            cancel_grace_secs: default_cancel_grace(),
        }
    }
}

fn default_max_parallel() -> usize {
    1
}

fn default_cancel_grace() -> u64 {
    5
}

/// Directory traversal
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_links: bool,
}
