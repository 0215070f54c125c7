use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables overriding configuration values.
///
/// Nested keys are separated by a double underscore, e.g.
/// `PLAYCHECK_SUPERVISOR__MAX_PARALLEL_JOBS=2`.
const ENV_PREFIX: &str = "PLAYCHECK_";

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load default configuration with environment variable overrides only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[supervisor]
max_parallel_jobs = 3
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.supervisor.max_parallel_jobs, 3);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[supervisor]
max_parallel_jobs = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/playcheck.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[tools]
ffmpeg_path = "/usr/local/bin/ffmpeg"

[encode]
output_suffix = "console"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.tools.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.encode.output_suffix, "console");
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "playcheck.toml",
                r#"
[supervisor]
max_parallel_jobs = 2
"#,
            )?;
            jail.set_env("PLAYCHECK_SUPERVISOR__MAX_PARALLEL_JOBS", "4");
            jail.set_env("PLAYCHECK_TOOLS__FFPROBE_PATH", "/bin/ffprobe");

            let config = load_config(Path::new("playcheck.toml")).expect("config loads");
            assert_eq!(config.supervisor.max_parallel_jobs, 4);
            assert_eq!(config.tools.ffprobe_path, PathBuf::from("/bin/ffprobe"));

            let env_only = load_config_from_env().expect("env config loads");
            assert_eq!(env_only.supervisor.max_parallel_jobs, 4);
            assert_eq!(env_only.encode.output_suffix, "ps3");
            Ok(())
        });
    }
}
