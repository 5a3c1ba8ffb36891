//! Turning detected silence into the transcode plan and its `select` filters.

use log::{info, warn};

use crate::error::Result;
use crate::silence::{self, KeepInterval};

/// What the transcode pass should do with the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// No silence was found, copy the streams untouched.
    Copy,
    /// Retain only the frames matched by `expression`.
    Select {
        keep: Vec<KeepInterval>,
        expression: String,
    },
}

impl Plan {
    /// Translates a `silencedetect` log into a plan.
    ///
    /// `probe_duration` is only called when silence was found.
    pub fn from_log(log: &str, probe_duration: impl FnOnce() -> Result<f64>) -> Result<Self> {
        let silences = silence::parse_silence_log(log)?;
        if silences.is_empty() {
            warn!("No silence regions detected, the video will be copied as-is");
            return Ok(Plan::Copy);
        }

        let total_duration = probe_duration()?;
        let plan = Plan::select(silence::keep_intervals(&silences, total_duration)?);
        info!(
            "{} silent regions, keeping {} segments ({:.2}s of {:.2}s)",
            silences.len(),
            plan.keep().len(),
            plan.kept_duration(),
            total_duration
        );

        Ok(plan)
    }

    /// Intervals that survive; empty for [`Plan::Copy`].
    pub fn keep(&self) -> &[KeepInterval] {
        match self {
            Plan::Copy => &[],
            Plan::Select { keep, .. } => keep,
        }
    }

    pub fn kept_duration(&self) -> f64 {
        self.keep().iter().map(KeepInterval::duration).sum()
    }

    pub fn select(keep: Vec<KeepInterval>) -> Self {
        let expression = expression(&keep);
        Plan::Select { keep, expression }
    }
}

/// `between(t,S,E)` per interval, OR-ed together with `+`.
pub fn expression(keep: &[KeepInterval]) -> String {
    keep.iter()
        .map(|interval| format!("between(t,{},{})", interval.start, interval.end))
        .collect::<Vec<_>>()
        .join("+")
}

/// Video side: drop frames and rebuild timestamps from the frame rate.
pub fn video_filter(expression: &str) -> String {
    format!("select='{}',setpts=N/FRAME_RATE/TB", expression)
}

/// Audio side: drop samples and rebuild timestamps from the sample rate.
pub fn audio_filter(expression: &str) -> String {
    format!("aselect='{}',asetpts=N/SR/TB", expression)
}
