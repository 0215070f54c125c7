//! Shell scripts standing in for `ffmpeg` in tests.
//!
//! Each script receives the real encoder argument list and treats the last
//! argument as the output file.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// How a fake encoder behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEncoder {
    /// Reports progress up to 60s, writes the output and exits 0.
    Succeed,
    /// Reports some progress, writes a partial output and exits with the code.
    ExitWith(i32),
    /// Reports progress and exits 0 without writing anything.
    NoOutput,
    /// Writes a partial output and keeps reporting progress until killed.
    Hang,
    /// Like `Hang`, but ignores SIGTERM.
    HangIgnoringTerm,
}

impl FakeEncoder {
    fn script(self) -> String {
        let body = match self {
            Self::Succeed => concat!(
                "echo 'out_time=00:00:15.000000'\n",
                "echo 'progress=continue'\n",
                "echo 'out_time=00:00:30.000000'\n",
                "echo 'frame=60 fps=30 time=00:00:45.00 bitrate=1.0kbits/s' >&2\n",
                "echo 'out_time=00:01:00.000000'\n",
                "echo 'progress=end'\n",
                "printf 'converted' > \"$out\"\n",
                "exit 0\n",
            )
            .to_string(),
            Self::ExitWith(code) => format!(
                concat!(
                    "echo 'out_time=00:00:10.000000'\n",
                    "printf 'partial' > \"$out\"\n",
                    "echo 'Error while decoding stream #0:0' >&2\n",
                    "echo 'Conversion failed!' >&2\n",
                    "exit {}\n",
                ),
                code
            ),
            Self::NoOutput => concat!(
                "echo 'out_time=00:00:30.000000'\n",
                "echo 'progress=end'\n",
                "exit 0\n",
            )
            .to_string(),
            Self::Hang => concat!(
                "printf 'partial' > \"$out\"\n",
                "while true; do echo 'out_time=00:00:01.000000'; sleep 0.1; done\n",
            )
            .to_string(),
            Self::HangIgnoringTerm => concat!(
                "trap '' TERM\n",
                "printf 'partial' > \"$out\"\n",
                "while true; do echo 'out_time=00:00:01.000000'; sleep 0.1; done\n",
            )
            .to_string(),
        };

        format!("#!/bin/sh\nfor out; do :; done\n{}", body)
    }
}

/// Writes an executable fake encoder into `dir` and returns its path.
pub fn write_fake_ffmpeg(dir: &Path, behavior: FakeEncoder) -> io::Result<PathBuf> {
    let path = dir.join(format!("fake-ffmpeg-{}", behavior_slug(behavior)));
    write_script(&path, &behavior.script())?;
    Ok(path)
}

/// Streams reported by a fake inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeStreams {
    /// First video stream: codec, width and height.
    pub video: Option<(String, u32, u32)>,
    /// Codec of the first audio stream.
    pub audio: Option<String>,
    /// Container duration in seconds.
    pub duration_secs: Option<f64>,
}

impl FakeStreams {
    pub fn new(video_codec: &str, audio_codec: &str, width: u32, height: u32) -> Self {
        Self {
            video: Some((video_codec.to_string(), width, height)),
            audio: Some(audio_codec.to_string()),
            duration_secs: Some(60.0),
        }
    }
}

/// Writes an executable fake `ffprobe` into `dir` and returns its path.
///
/// The script answers the video stream, audio stream and duration queries
/// with JSON shaped like the real tool's output.
pub fn write_fake_ffprobe(dir: &Path, streams: &FakeStreams) -> io::Result<PathBuf> {
    let video = match &streams.video {
        Some((codec, width, height)) => format!(
            r#"{{"codec_name": "{}", "width": {}, "height": {}}}"#,
            codec, width, height
        ),
        None => String::new(),
    };
    let audio = match &streams.audio {
        Some(codec) => format!(r#"{{"codec_name": "{}"}}"#, codec),
        None => String::new(),
    };
    let duration = match streams.duration_secs {
        Some(secs) => format!(r#"{{"format": {{"duration": "{:.6}"}}}}"#, secs),
        None => r#"{"format": {}}"#.to_string(),
    };

    let script = format!(
        concat!(
            "#!/bin/sh\n",
            "case \"$*\" in\n",
            "  *v:0*) echo '{{\"streams\": [{}]}}' ;;\n",
            "  *a:0*) echo '{{\"streams\": [{}]}}' ;;\n",
            "  *) echo '{}' ;;\n",
            "esac\n",
        ),
        video, audio, duration
    );

    let path = dir.join("fake-ffprobe");
    write_script(&path, &script)?;
    Ok(path)
}

fn behavior_slug(behavior: FakeEncoder) -> String {
    match behavior {
        FakeEncoder::Succeed => "succeed".to_string(),
        FakeEncoder::ExitWith(code) => format!("exit-{}", code),
        FakeEncoder::NoOutput => "no-output".to_string(),
        FakeEncoder::Hang => "hang".to_string(),
        FakeEncoder::HangIgnoringTerm => "hang-ignoring-term".to_string(),
    }
}

fn write_script(path: &Path, script: &str) -> io::Result<()> {
    fs::write(path, script)?;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_take_output_from_last_argument() {
        for behavior in [FakeEncoder::Succeed, FakeEncoder::ExitWith(3), FakeEncoder::Hang] {
            let script = behavior.script();
            assert!(script.starts_with("#!/bin/sh\nfor out; do :; done\n"));
        }
        assert!(FakeEncoder::ExitWith(3).script().contains("exit 3"));
    }

    #[tokio::test]
    async fn test_fake_encoder_writes_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = write_fake_ffmpeg(dir.path(), FakeEncoder::Succeed).unwrap();
        let output = dir.path().join("out.mp4");

        let status = tokio::process::Command::new(&ffmpeg)
            .args(["-i", "in.mkv"])
            .arg(&output)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .unwrap();

        assert!(status.success());
        assert_eq!(fs::read_to_string(&output).unwrap(), "converted");
    }
}
