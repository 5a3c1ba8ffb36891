use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("input path has no file name: {}", path.display())]
    InvalidInput { path: PathBuf },

    #[error("failed to execute {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {status}:\n{stderr_tail}")]
    EngineFailed {
        program: String,
        status: ExitStatus,
        stderr_tail: String,
    },

    #[error("could not determine input duration (ffprobe said {output:?})")]
    DurationUnavailable { output: String },

    #[error("all content would be removed, check the silence detection parameters")]
    AllContentRemoved,

    #[error("invalid noise threshold {value:?}, expected e.g. -50dB")]
    InvalidThreshold { value: String },

    #[error("invalid minimum silence duration {value}, must be positive")]
    InvalidDuration { value: f64 },

    #[error(transparent)]
    Regex(#[from] regex::Error),
}
