pub mod config;
pub mod converter;
pub mod media;
pub mod profile;
pub mod scan;
pub mod supervisor;
pub mod testing;
pub mod tools;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError,
};
pub use converter::{ConversionError, ConversionJob, JobEvent, JobOutcome, JobState};
pub use media::{ClassificationResult, FfprobeProber, MediaFile, MediaProber, ProbeError};
pub use profile::TargetProfile;
pub use scan::{ScanError, ScanEvent, ScanOrchestrator, ScanSession, ScanSummary};
pub use supervisor::{JobHandle, JobSupervisor, SupervisorError};
pub use tools::{check_tools, ToolError};
