//! Encoder command construction and output naming.

use std::path::{Path, PathBuf};

use crate::config::EncodeConfig;
use crate::profile::TargetProfile;

/// Derives `<stem>_<suffix>.<container>` for a source file.
///
/// The file lands next to the source unless `encode.output_dir` is set.
pub fn output_path_for(source: &Path, encode: &EncodeConfig) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!(
        "{}_{}.{}",
        stem,
        encode.output_suffix,
        encode.container.trim_start_matches('.')
    );

    let dir = match &encode.output_dir {
        Some(dir) => dir.clone(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    dir.join(file_name)
}

/// Scale filter that fits the frame in the profile's bounds without
/// upscaling, then rounds both sides down to even values for the encoder.
pub fn scale_filter(max_width: u32, max_height: u32) -> String {
    format!(
        "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease,scale=trunc(iw/2)*2:trunc(ih/2)*2",
        max_width, max_height
    )
}

/// Builds the ffmpeg argument list for one conversion.
pub fn build_encode_args(
    input_path: &Path,
    output_path: &Path,
    overwrite: bool,
    encode: &EncodeConfig,
    profile: &TargetProfile,
) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        // Never clobber unless asked to
        if overwrite { "-y" } else { "-n" }.to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
    ];

    // Video
    args.extend([
        "-c:v".to_string(),
        encode.video_codec.clone(),
        "-profile:v".to_string(),
        encode.video_profile.clone(),
        "-level:v".to_string(),
        encode.video_level.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-b:v".to_string(),
        format!("{}k", encode.video_bitrate_kbps),
        "-vf".to_string(),
        scale_filter(profile.max_width, profile.max_height),
    ]);

    // Audio
    args.extend([
        "-c:a".to_string(),
        encode.audio_codec.clone(),
        "-b:a".to_string(),
        format!("{}k", encode.audio_bitrate_kbps),
    ]);

    // Log level and progress
    args.extend([
        "-loglevel".to_string(),
        encode.ffmpeg_log_level.clone(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ]);

    args.extend(encode.extra_ffmpeg_args.iter().cloned());

    // Output
    args.push(output_path.to_string_lossy().to_string());

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_output_path_next_to_source() {
        let path = output_path_for(Path::new("/videos/show/ep01.mkv"), &EncodeConfig::default());
        assert_eq!(path, PathBuf::from("/videos/show/ep01_ps3.mp4"));
    }

    #[test]
    fn test_output_path_differs_from_compatible_name() {
        let source = Path::new("/videos/movie.mp4");
        let path = output_path_for(source, &EncodeConfig::default());
        assert_eq!(path, PathBuf::from("/videos/movie_ps3.mp4"));
        assert_ne!(path, source);
    }

    #[test]
    fn test_output_path_in_output_dir() {
        let encode = EncodeConfig {
            output_dir: Some(PathBuf::from("/converted")),
            output_suffix: "console".to_string(),
            container: ".avi".to_string(),
            ..Default::default()
        };
        let path = output_path_for(Path::new("/videos/clip.webm"), &encode);
        assert_eq!(path, PathBuf::from("/converted/clip_console.avi"));
    }

    #[test]
    fn test_build_encode_args() {
        let args = build_encode_args(
            Path::new("/in.mkv"),
            Path::new("/in_ps3.mp4"),
            false,
            &EncodeConfig::default(),
            &TargetProfile::default(),
        );

        assert!(args.contains(&"-n".to_string()));
        assert!(!args.contains(&"-y".to_string()));
        assert_eq!(value_after(&args, "-i"), Some("/in.mkv"));
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-profile:v"), Some("high"));
        assert_eq!(value_after(&args, "-level:v"), Some("4.1"));
        assert_eq!(value_after(&args, "-b:v"), Some("5000k"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-b:a"), Some("192k"));
        assert_eq!(value_after(&args, "-progress"), Some("pipe:1"));
        assert_eq!(args.last().map(String::as_str), Some("/in_ps3.mp4"));
    }

    #[test]
    fn test_build_encode_args_overwrite_and_extra() {
        let encode = EncodeConfig {
            extra_ffmpeg_args: vec!["-threads".to_string(), "2".to_string()],
            ..Default::default()
        };
        let args = build_encode_args(
            Path::new("/in.mkv"),
            Path::new("/out.mp4"),
            true,
            &encode,
            &TargetProfile::default(),
        );

        assert!(args.contains(&"-y".to_string()));
        assert_eq!(value_after(&args, "-threads"), Some("2"));
        assert_eq!(args.last().map(String::as_str), Some("/out.mp4"));
    }

    #[test]
    fn test_scale_filter_uses_profile_bounds_and_even_dimensions() {
        let profile = TargetProfile {
            max_width: 1280,
            max_height: 720,
            ..Default::default()
        };
        let args = build_encode_args(
            Path::new("/in.mkv"),
            Path::new("/out.mp4"),
            false,
            &EncodeConfig::default(),
            &profile,
        );

        let filter = value_after(&args, "-vf").unwrap();
        assert!(filter.contains("min(1280,iw)"));
        assert!(filter.contains("min(720,ih)"));
        assert!(filter.ends_with("scale=trunc(iw/2)*2:trunc(ih/2)*2"));
    }
}
