//! Trait definitions for the media module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ProbeError;
use super::types::MediaFile;

/// Something that can inspect media files without decoding them.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Reads codec and resolution of the first video and audio streams.
    async fn probe(&self, path: &Path) -> Result<MediaFile, ProbeError>;

    /// Reads the container duration in seconds.
    async fn duration(&self, path: &Path) -> Result<f64, ProbeError>;
}
