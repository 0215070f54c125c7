//! Testing utilities for exercising scans and conversions without real media.
//!
//! # Example
//!
//! ```rust,ignore
//! use playcheck_core::testing::{fake_tools, FakeEncoder, MockProber};
//!
//! let prober = MockProber::new();
//! prober.set_streams("movie.mkv", "hevc", "ac3", 3840, 2160).await;
//! prober.set_error("notes.txt", "Invalid data found when processing input").await;
//!
//! let ffmpeg = fake_tools::write_fake_ffmpeg(dir.path(), FakeEncoder::Succeed)?;
//! ```

mod mock_prober;

#[cfg(unix)]
pub mod fake_tools;

pub use mock_prober::MockProber;

#[cfg(unix)]
pub use fake_tools::FakeEncoder;
