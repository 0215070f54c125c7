//! Mock prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::media::{MediaFile, MediaProber, ProbeError};

/// Duration reported for files without an explicit one.
const DEFAULT_DURATION_SECS: f64 = 60.0;

/// Configured response for one file name.
#[derive(Debug, Clone)]
enum ProbeResponse {
    Streams {
        video_codec: String,
        audio_codec: String,
        width: u32,
        height: u32,
    },
    Error(String),
}

/// Mock implementation of the `MediaProber` trait.
///
/// Responses are keyed by file name, so the same setup works for any
/// directory. Files without a configured response are unreadable.
#[derive(Debug)]
pub struct MockProber {
    responses: Arc<RwLock<HashMap<String, ProbeResponse>>>,
    durations: Arc<RwLock<HashMap<String, Result<f64, String>>>>,
    probed: Arc<RwLock<Vec<PathBuf>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProber {
    /// Create a new mock prober.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            durations: Arc::new(RwLock::new(HashMap::new())),
            probed: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Report the given first video and audio streams for `file_name`.
    pub async fn set_streams(
        &self,
        file_name: &str,
        video_codec: &str,
        audio_codec: &str,
        width: u32,
        height: u32,
    ) {
        self.responses.write().await.insert(
            file_name.to_string(),
            ProbeResponse::Streams {
                video_codec: video_codec.to_string(),
                audio_codec: audio_codec.to_string(),
                width,
                height,
            },
        );
    }

    /// Make probing `file_name` fail with `reason`.
    pub async fn set_error(&self, file_name: &str, reason: &str) {
        self.responses
            .write()
            .await
            .insert(file_name.to_string(), ProbeResponse::Error(reason.to_string()));
    }

    /// Set the duration reported for `file_name`.
    pub async fn set_duration(&self, file_name: &str, secs: f64) {
        self.durations
            .write()
            .await
            .insert(file_name.to_string(), Ok(secs));
    }

    /// Make the duration query for `file_name` fail with `reason`.
    pub async fn set_duration_error(&self, file_name: &str, reason: &str) {
        self.durations
            .write()
            .await
            .insert(file_name.to_string(), Err(reason.to_string()));
    }

    /// Delay every probe by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Paths probed so far, in call order.
    pub async fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.read().await.clone()
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MediaProber for MockProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaFile, ProbeError> {
        self.probed.write().await.push(path.to_path_buf());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .read()
            .await
            .get(&Self::file_name(path))
            .cloned();

        match response {
            Some(ProbeResponse::Streams {
                video_codec,
                audio_codec,
                width,
                height,
            }) => {
                let mut file = MediaFile::unprobed(path);
                file.video_codec = Some(video_codec);
                file.audio_codec = Some(audio_codec);
                file.width = Some(width);
                file.height = Some(height);
                Ok(file)
            }
            Some(ProbeResponse::Error(reason)) => Err(ProbeError::new(path, reason)),
            None => Err(ProbeError::new(path, "Invalid data found when processing input")),
        }
    }

    async fn duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let durations = self.durations.read().await;
        match durations.get(&Self::file_name(path)) {
            Some(Ok(secs)) => Ok(*secs),
            Some(Err(reason)) => Err(ProbeError::new(path, reason.clone())),
            None => Ok(DEFAULT_DURATION_SECS),
        }
    }
}
