use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::ffmpeg::{Engine, SilenceDetect, FFMPEG_EXECUTABLE, FFPROBE_EXECUTABLE};

/// Remove silent parts from a video using ffmpeg.
///
/// Writes the result next to the input, named with a prefix:
///
///   shutup talk.mp4   # produces outfile_talk.mp4
#[derive(Parser, Debug, Clone)]
#[command(name = "shutup", version, about, long_about = None)]
pub struct Args {
    /// Path to the input video file
    pub input: PathBuf,

    /// Noise floor below which audio counts as silence
    #[arg(short = 'n', long, default_value = "-50dB", allow_hyphen_values = true)]
    pub noise_threshold: String,

    /// Minimum silence duration in seconds
    #[arg(short = 'd', long, default_value = "1")]
    pub duration: f64,

    /// Prefix for the output file name
    #[arg(long, default_value = "outfile_")]
    pub prefix: String,

    /// Print the final ffmpeg command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// ffmpeg binary
    #[arg(long, env = "SHUTUP_FFMPEG", default_value = FFMPEG_EXECUTABLE)]
    pub ffmpeg: PathBuf,

    /// ffprobe binary, used to read the input duration
    #[arg(long, env = "SHUTUP_FFPROBE", default_value = FFPROBE_EXECUTABLE)]
    pub ffprobe: PathBuf,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn engine(&self) -> Engine {
        Engine::new(&self.ffmpeg, &self.ffprobe)
    }

    /// Validated `silencedetect` settings.
    pub fn detection(&self) -> Result<SilenceDetect> {
        let noise_db = validate_threshold(&self.noise_threshold)?;
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(Error::InvalidDuration {
                value: self.duration,
            });
        }
        Ok(SilenceDetect {
            noise: format!("{}dB", noise_db),
            duration: self.duration,
        })
    }
}

/// Accepts a plain number or one suffixed with `dB`, e.g. `-50dB` or `-50`,
/// and returns the level in dB. ffmpeg reads a bare number as a linear ratio
/// and only knows the exact `dB` suffix, so callers re-render the value.
fn validate_threshold(threshold: &str) -> Result<f64> {
    let number = threshold
        .trim()
        .trim_end_matches("dB")
        .trim_end_matches("db")
        .trim_end_matches("DB");

    number
        .parse::<f64>()
        .ok()
        .filter(|db| db.is_finite())
        .ok_or_else(|| Error::InvalidThreshold {
            value: threshold.to_string(),
        })
}
