use log::{debug, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result};
use crate::select::{self, Plan};

pub const FFMPEG_EXECUTABLE: &str = "ffmpeg";
pub const FFPROBE_EXECUTABLE: &str = "ffprobe";

const STDERR_TAIL_LINES: usize = 5;

/// Parameters for the `silencedetect` analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceDetect {
    /// Noise floor, e.g. `-50dB`.
    pub noise: String,
    /// Minimum silence length in seconds.
    pub duration: f64,
}

impl Default for SilenceDetect {
    fn default() -> Self {
        SilenceDetect {
            noise: "-50dB".to_string(),
            duration: 1.0,
        }
    }
}

impl SilenceDetect {
    pub fn filter(&self) -> String {
        format!("silencedetect=n={}:d={}", self.noise, self.duration)
    }
}

/// The ffmpeg / ffprobe binaries to run.
#[derive(Debug, Clone)]
pub struct Engine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(FFMPEG_EXECUTABLE, FFPROBE_EXECUTABLE)
    }
}

impl Engine {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Engine {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn detect_command(&self, input: &Path, settings: &SilenceDetect) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .arg("-af")
            .arg(settings.filter())
            .arg("-f")
            .arg("null")
            .arg("-")
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }

    pub fn probe_command(&self, input: &Path) -> Command {
        let mut command = Command::new(&self.ffprobe);
        command
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }

    pub fn transcode_command(&self, input: &Path, output: &Path, plan: &Plan) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-i").arg(input);

        match plan {
            Plan::Copy => {
                command.arg("-c").arg("copy");
            }
            Plan::Select { expression, .. } => {
                command
                    .arg("-vf")
                    .arg(select::video_filter(expression))
                    .arg("-af")
                    .arg(select::audio_filter(expression));
            }
        }

        command.arg(output);
        command
    }

    /// Runs the analysis pass and returns ffmpeg's diagnostic output.
    pub fn detect_silence(&self, input: &Path, settings: &SilenceDetect) -> Result<String> {
        let mut command = self.detect_command(input, settings);
        debug!("Executing: {}", describe(&command));

        let output = command.output().map_err(|source| spawn_error(&self.ffmpeg, source))?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::EngineFailed {
                program: self.ffmpeg.display().to_string(),
                status: output.status,
                stderr_tail: tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(stderr)
    }

    /// Total duration in seconds, from ffprobe or failing that the
    /// `Duration:` header of `detection_log`.
    pub fn probe_duration(&self, input: &Path, detection_log: &str) -> Result<f64> {
        let mut command = self.probe_command(input);
        debug!("Executing: {}", describe(&command));

        let output = command.output().map_err(|source| spawn_error(&self.ffprobe, source))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let probed = stdout.trim();

        if let Some(duration) = parse_seconds(probed) {
            return Ok(duration);
        }

        if let Some(duration) = parse_duration(detection_log)? {
            warn!(
                "ffprobe returned {:?}, using duration {:.2}s from the ffmpeg log",
                probed, duration
            );
            return Ok(duration);
        }

        Err(Error::DurationUnavailable {
            output: probed.to_string(),
        })
    }

    /// Runs `command` to completion with inherited stdio.
    pub fn run(&self, command: &mut Command) -> Result<ExitStatus> {
        info!("Executing: {}", describe(command));
        let program = PathBuf::from(command.get_program());
        command.status().map_err(|source| spawn_error(&program, source))
    }
}

fn spawn_error(program: &Path, source: std::io::Error) -> Error {
    Error::Spawn {
        program: program.display().to_string(),
        source,
    }
}

fn parse_seconds(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
}

/// Reads `Duration: HH:MM:SS.ss` from an ffmpeg banner.
pub fn parse_duration(output: &str) -> Result<Option<f64>> {
    let duration_re = Regex::new(r"Duration: (\d+):(\d{2}):(\d{2}(?:\.\d+)?)")?;

    let Some(cap) = duration_re.captures(output) else {
        return Ok(None);
    };

    let hours: f64 = cap[1].parse().unwrap_or_default();
    let minutes: f64 = cap[2].parse().unwrap_or_default();
    let seconds: f64 = cap[3].parse().unwrap_or_default();
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    Ok(Some(total).filter(|total| *total > 0.0))
}

/// Renders a command the way it would be typed in a shell, for logging.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                format!("\"{}\"", arg)
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silence::KeepInterval;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_detect_command() {
        let engine = Engine::default();
        let command = engine.detect_command(Path::new("talk.mp4"), &SilenceDetect::default());
        assert_eq!(command.get_program(), "ffmpeg");
        assert_eq!(
            args(&command),
            [
                "-hide_banner",
                "-i",
                "talk.mp4",
                "-af",
                "silencedetect=n=-50dB:d=1",
                "-f",
                "null",
                "-"
            ]
        );
    }

    #[test]
    fn test_detect_filter_custom() {
        let settings = SilenceDetect {
            noise: "-35dB".to_string(),
            duration: 0.5,
        };
        assert_eq!(settings.filter(), "silencedetect=n=-35dB:d=0.5");
    }

    #[test]
    fn test_probe_command() {
        let engine = Engine::new("/opt/ffmpeg/bin/ffmpeg", "/opt/ffmpeg/bin/ffprobe");
        let command = engine.probe_command(Path::new("talk.mp4"));
        assert_eq!(command.get_program(), "/opt/ffmpeg/bin/ffprobe");
        assert_eq!(
            args(&command),
            [
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                "talk.mp4"
            ]
        );
    }

    #[test]
    fn test_transcode_copy() {
        let engine = Engine::default();
        let command = engine.transcode_command(
            Path::new("talk.mp4"),
            Path::new("outfile_talk.mp4"),
            &Plan::Copy,
        );
        assert_eq!(args(&command), ["-i", "talk.mp4", "-c", "copy", "outfile_talk.mp4"]);
    }

    #[test]
    fn test_transcode_select() {
        let engine = Engine::default();
        let plan = Plan::select(vec![
            KeepInterval { start: 0.0, end: 2.0 },
            KeepInterval { start: 3.0, end: 10.0 },
        ]);
        let command = engine.transcode_command(
            Path::new("talk.mp4"),
            Path::new("outfile_talk.mp4"),
            &plan,
        );
        assert_eq!(
            args(&command),
            [
                "-i",
                "talk.mp4",
                "-vf",
                "select='between(t,0,2)+between(t,3,10)',setpts=N/FRAME_RATE/TB",
                "-af",
                "aselect='between(t,0,2)+between(t,3,10)',asetpts=N/SR/TB",
                "outfile_talk.mp4"
            ]
        );
    }

    #[test]
    fn test_parse_duration() {
        let log = "Input #0, matroska,webm, from 'a.mkv':\n  \
                   Duration: 01:02:03.50, start: 0.000000, bitrate: 3000 kb/s\n";
        let duration = parse_duration(log).unwrap().unwrap();
        assert!((duration - 3723.5).abs() < 1e-9);

        assert_eq!(parse_duration("Duration: N/A, bitrate: N/A").unwrap(), None);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("10.000000"), Some(10.0));
        assert_eq!(parse_seconds("N/A"), None);
        assert_eq!(parse_seconds(""), None);
        assert_eq!(parse_seconds("NaN"), None);
    }

    #[test]
    fn test_describe_quotes_whitespace() {
        let mut command = Command::new("ffmpeg");
        command.args(["-i", "my talk.mp4", "-c", "copy"]);
        assert_eq!(describe(&command), "ffmpeg -i \"my talk.mp4\" -c copy");
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let engine = Engine::new("/nonexistent/ffmpeg-binary", "/nonexistent/ffprobe-binary");
        let result = engine.detect_silence(Path::new("talk.mp4"), &SilenceDetect::default());
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }
}
