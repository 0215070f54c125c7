//! Directory scanning and batch conversion.
//!
//! A scan walks a directory tree, probes and classifies every regular file
//! against the configured `TargetProfile` and, when asked to, submits each
//! incompatible file for conversion. Progress is streamed as `ScanEvent`s and
//! the scan ends with a `ScanSummary`.
//!
//! # Example
//!
//! ```ignore
//! use playcheck_core::scan::ScanOrchestrator;
//!
//! let orchestrator = ScanOrchestrator::new(config, prober);
//! let mut session = orchestrator.run_scan("/videos", true).await?;
//!
//! while let Some(event) = session.next_event().await {
//!     println!("{:?}", event);
//! }
//! let summary = session.finish().await?;
//! println!("{} unsupported", summary.unsupported.len());
//! ```

mod error;
mod orchestrator;
mod types;
mod walker;

pub use error::ScanError;
pub use orchestrator::{ScanOrchestrator, ScanSession};
pub use types::{ScanEvent, ScanSummary, UnreadableFile};
