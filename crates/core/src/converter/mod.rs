//! Converter module for transcoding incompatible media files.
//!
//! A `ConversionJob` supervises one `ffmpeg` invocation: it builds the command
//! line, owns the child process, turns the elapsed-time field of the encoder
//! output into a monotonic percentage and reports a terminal `JobOutcome`.
//!
//! Jobs are not run directly; they are submitted to a
//! [`JobSupervisor`](crate::supervisor::JobSupervisor), which bounds
//! concurrency and can cancel them.
//!
//! # Example
//!
//! ```ignore
//! use playcheck_core::converter::ConversionJob;
//!
//! let job = ConversionJob::new(media_file, &config.encode);
//! println!("Output: {}", job.output_path().display());
//!
//! let handle = supervisor.submit(job).await?;
//! let snapshot = handle.wait().await;
//! println!("Finished as {:?}", snapshot.state);
//! ```

mod command;
mod error;
mod job;
mod process;
mod progress;
mod types;

pub use command::{build_encode_args, output_path_for, scale_filter};
pub use error::ConversionError;
pub use job::ConversionJob;
pub(crate) use job::{JobContext, JobControl};
pub use progress::{parse_elapsed_secs, OutputTail, ProgressTracker};
pub use types::{ConversionProgress, JobEvent, JobOutcome, JobSnapshot, JobState};
