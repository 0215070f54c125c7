//! Supervision of conversion jobs.
//!
//! The `JobSupervisor` coordinates:
//! - Concurrency: a semaphore bounds how many encoders run at once
//! - Registry: every outstanding job is tracked so it can be cancelled
//! - Events: all job events are serialized into a single ordered stream
//!
//! # Example
//!
//! ```ignore
//! use playcheck_core::supervisor::JobSupervisor;
//!
//! let (supervisor, mut events) = JobSupervisor::new(&config, prober);
//! let handle = supervisor.submit(job).await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//!
//! // On shutdown, no encoder outlives this call
//! supervisor.cancel_all().await;
//! ```

mod error;
mod handle;
mod pool;

pub use error::SupervisorError;
pub use handle::JobHandle;
pub use pool::{JobSupervisor, SupervisorEvents, SupervisorStatus};
