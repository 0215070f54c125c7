//! Media probing.
//!
//! This module provides the `MediaProber` trait and an implementation backed by
//! `ffprobe`. A probe is a read-only inspection of the first video and first
//! audio stream of a file; every failure (missing tool, non-zero exit,
//! unparseable output, missing streams) is reported as a single `ProbeError`.
//!
//! # Example
//!
//! ```ignore
//! use playcheck_core::media::{FfprobeProber, MediaProber};
//!
//! let prober = FfprobeProber::with_defaults();
//! let file = prober.probe(Path::new("/videos/movie.mkv")).await?;
//! println!("{:?} / {:?}", file.video_codec, file.audio_codec);
//! ```

mod error;
mod ffprobe;
mod prober;
mod types;

pub use error::ProbeError;
pub use ffprobe::FfprobeProber;
pub use prober::MediaProber;
pub use types::{ClassificationKind, ClassificationResult, MediaFile};
