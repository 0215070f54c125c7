//! FFprobe-based prober implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::ProbeError;
use super::prober::MediaProber;
use super::types::{extension_of, MediaFile};
use crate::config::ToolsConfig;

#[derive(Debug, Deserialize)]
struct StreamsOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FormatOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Prober that shells out to `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Creates a new prober from the tools configuration.
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    /// Creates a prober that runs `ffprobe` from `PATH`.
    pub fn with_defaults() -> Self {
        Self::new(&ToolsConfig::default())
    }

    /// Runs ffprobe with the given arguments and returns its stdout.
    async fn run(&self, path: &Path, args: &[&str]) -> Result<String, ProbeError> {
        let child = Command::new(&self.ffprobe_path)
            .args(["-v", "error"])
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::new(
                        path,
                        format!("ffprobe not found at {}", self.ffprobe_path.display()),
                    )
                } else {
                    ProbeError::new(path, format!("failed to start ffprobe: {}", e))
                }
            })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ProbeError::new(
                    path,
                    format!("ffprobe timed out after {} seconds", self.timeout.as_secs()),
                )
            })?
            .map_err(|e| ProbeError::new(path, format!("ffprobe I/O error: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::new(
                path,
                format!(
                    "ffprobe exited with code {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parses the first stream out of a `-show_entries stream=...` JSON document.
    fn parse_first_stream(
        path: &Path,
        output: &str,
        kind: &str,
    ) -> Result<ProbeStream, ProbeError> {
        let parsed: StreamsOutput = serde_json::from_str(output).map_err(|e| {
            ProbeError::new(path, format!("unparseable ffprobe output for {} stream: {}", kind, e))
        })?;

        parsed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::new(path, format!("no {} stream found", kind)))
    }

    /// Combines video and audio stream output into a `MediaFile`.
    fn parse_media_file(
        path: &Path,
        video_output: &str,
        audio_output: &str,
    ) -> Result<MediaFile, ProbeError> {
        let video = Self::parse_first_stream(path, video_output, "video")?;
        let audio = Self::parse_first_stream(path, audio_output, "audio")?;

        let video_codec = non_empty(video.codec_name)
            .ok_or_else(|| ProbeError::new(path, "video stream has no codec name"))?;
        let audio_codec = non_empty(audio.codec_name)
            .ok_or_else(|| ProbeError::new(path, "audio stream has no codec name"))?;
        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(ProbeError::new(path, "video stream has no resolution")),
        };

        Ok(MediaFile {
            path: path.to_path_buf(),
            extension: extension_of(path),
            video_codec: Some(video_codec),
            audio_codec: Some(audio_codec),
            width: Some(width),
            height: Some(height),
        })
    }

    /// Parses a `-show_entries format=duration` JSON document.
    fn parse_duration(path: &Path, output: &str) -> Result<f64, ProbeError> {
        let parsed: FormatOutput = serde_json::from_str(output).map_err(|e| {
            ProbeError::new(path, format!("unparseable ffprobe duration output: {}", e))
        })?;

        let raw = parsed
            .format
            .duration
            .ok_or_else(|| ProbeError::new(path, "container reports no duration"))?;

        let secs = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ProbeError::new(path, format!("invalid duration: {}", raw)))?;

        if !secs.is_finite() || secs <= 0.0 {
            return Err(ProbeError::new(path, format!("invalid duration: {}", raw)));
        }

        Ok(secs)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<MediaFile, ProbeError> {
        let video_output = self
            .run(
                path,
                &[
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream=codec_name,width,height",
                    "-of",
                    "json",
                ],
            )
            .await?;

        let audio_output = self
            .run(
                path,
                &[
                    "-select_streams",
                    "a:0",
                    "-show_entries",
                    "stream=codec_name",
                    "-of",
                    "json",
                ],
            )
            .await?;

        let file = Self::parse_media_file(path, &video_output, &audio_output)?;
        debug!(
            path = %path.display(),
            video = ?file.video_codec,
            audio = ?file.audio_codec,
            resolution = %file.resolution_label(),
            "Probed file"
        );
        Ok(file)
    }

    async fn duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = self
            .run(path, &["-show_entries", "format=duration", "-of", "json"])
            .await?;
        Self::parse_duration(path, &output)
    }
}
