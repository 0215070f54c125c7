use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one parallel job
/// - Profile allow-lists and dimensions are non-empty
/// - Output suffix and container are usable in a file name
/// - Bitrates are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.supervisor.max_parallel_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "supervisor.max_parallel_jobs cannot be 0".to_string(),
        ));
    }

    if config.tools.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tools.probe_timeout_secs cannot be 0".to_string(),
        ));
    }

    let profile = &config.profile;
    if profile.max_width == 0 || profile.max_height == 0 {
        return Err(ConfigError::ValidationError(
            "profile.max_width and profile.max_height cannot be 0".to_string(),
        ));
    }
    for (key, list) in [
        ("profile.extensions", &profile.extensions),
        ("profile.video_codecs", &profile.video_codecs),
        ("profile.audio_codecs", &profile.audio_codecs),
    ] {
        if list.iter().all(|v| v.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", key)));
        }
    }

    let encode = &config.encode;
    for (key, value) in [
        ("encode.output_suffix", &encode.output_suffix),
        ("encode.container", &encode.container),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", key)));
        }
        if value.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot contain path separators",
                key
            )));
        }
    }
    if encode.video_bitrate_kbps == 0 || encode.audio_bitrate_kbps == 0 {
        return Err(ConfigError::ValidationError(
            "encode bitrates cannot be 0".to_string(),
        ));
    }

    Ok(())
}
