use log::{debug, warn};
use regex::Regex;

use crate::error::{Error, Result};

/// A span reported by `silencedetect`.
///
/// `end` is `None` when the log ends while silence is still running, which
/// ffmpeg does for files that end quietly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: Option<f64>,
}

/// A span of the input that survives into the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepInterval {
    pub start: f64,
    pub end: f64,
}

impl KeepInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Collects `silence_start` / `silence_end` pairs from ffmpeg's stderr, in log order.
pub fn parse_silence_log(log: &str) -> Result<Vec<SilenceInterval>> {
    let start_pattern = Regex::new(r"silence_start:\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)")?;
    let end_pattern = Regex::new(r"silence_end:\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)")?;

    let mut intervals = Vec::new();
    let mut open: Option<f64> = None;

    for line in log.lines() {
        if let Some(start) = capture_seconds(&start_pattern, line) {
            if let Some(previous) = open.replace(start) {
                debug!("silence_start {} superseded by {}", previous, start);
            }
            continue;
        }

        let Some(end) = capture_seconds(&end_pattern, line) else {
            continue;
        };

        match open.take() {
            Some(start) if end > start => {
                debug!("silence {:.3}s - {:.3}s", start, end);
                intervals.push(SilenceInterval {
                    start,
                    end: Some(end),
                });
            }
            Some(start) => warn!("discarding inverted silence {:.3}s - {:.3}s", start, end),
            None => debug!("silence_end {} without a start, ignoring", end),
        }
    }

    if let Some(start) = open {
        debug!("silence {:.3}s - end of file", start);
        intervals.push(SilenceInterval { start, end: None });
    }

    Ok(intervals)
}

// ffmpeg reports slightly negative starts for silence at t=0
fn capture_seconds(pattern: &Regex, line: &str) -> Option<f64> {
    pattern
        .captures(line)
        .and_then(|cap| cap[1].parse::<f64>().ok())
        .map(|seconds| seconds.max(0.0))
}

/// Complements `silences` within `[0, total_duration]`.
///
/// A leading silence produces no initial keep interval and a trailing one no
/// final keep interval. Fails with [`Error::AllContentRemoved`] rather than
/// returning an empty list.
pub fn keep_intervals(
    silences: &[SilenceInterval],
    total_duration: f64,
) -> Result<Vec<KeepInterval>> {
    let mut keep = Vec::new();
    let mut cursor = 0.0_f64;

    for silence in silences {
        let start = silence.start.min(total_duration);
        if start > cursor {
            keep.push(KeepInterval { start: cursor, end: start });
        }
        cursor = cursor.max(silence.end.unwrap_or(total_duration));
    }

    if cursor < total_duration {
        keep.push(KeepInterval {
            start: cursor,
            end: total_duration,
        });
    }

    if keep.is_empty() {
        return Err(Error::AllContentRemoved);
    }

    for interval in &keep {
        debug!("keep {:.3}s - {:.3}s", interval.start, interval.end);
    }

    Ok(keep)
}
