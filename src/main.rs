use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use simplelog::{ColorChoice, ConfigBuilder, TerminalMode, TermLogger};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::cli::Args;
use crate::error::Error;
use crate::ffmpeg::describe;
use crate::select::Plan;

mod cli;
mod error;
mod ffmpeg;
mod select;
mod silence;

/// `dir/name.ext` -> `dir/<prefix>name.ext`
fn output_path(input: &Path, prefix: &str) -> Result<PathBuf, Error> {
    let file_name = input.file_name().ok_or_else(|| Error::InvalidInput {
        path: input.to_path_buf(),
    })?;

    let mut prefixed = OsString::from(prefix);
    prefixed.push(file_name);
    Ok(input.with_file_name(prefixed))
}

fn run(args: &Args) -> Result<Option<ExitStatus>> {
    if !args.input.exists() {
        return Err(Error::InputNotFound {
            path: args.input.clone(),
        }
        .into());
    }

    let detection = args.detection()?;
    let engine = args.engine();
    let output = output_path(&args.input, &args.prefix)?;

    info!(
        "Detecting silence in {} ({})",
        args.input.display(),
        detection.filter()
    );
    let log = engine
        .detect_silence(&args.input, &detection)
        .context("silence detection failed")?;
    debug!("silencedetect produced {} lines of output", log.lines().count());

    let plan = Plan::from_log(&log, || engine.probe_duration(&args.input, &log))?;
    let mut command = engine.transcode_command(&args.input, &output, &plan);

    if args.dry_run {
        println!("{}", describe(&command));
        return Ok(None);
    }

    let status = engine
        .run(&mut command)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("{} finished with {}", output.display(), status);
    Ok(Some(status))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigBuilder::new()
        .set_time_level(log::LevelFilter::Off)
        .build();
    TermLogger::init(
        args.log_level(),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    match run(&args)? {
        Some(status) if !status.success() => std::process::exit(status.code().unwrap_or(1)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_prefixes_file_name() {
        assert_eq!(
            output_path(Path::new("talk.mp4"), "outfile_").unwrap(),
            PathBuf::from("outfile_talk.mp4")
        );
        assert_eq!(
            output_path(Path::new("clips/2024/talk.mkv"), "outfile_").unwrap(),
            PathBuf::from("clips/2024/outfile_talk.mkv")
        );
        assert_eq!(
            output_path(Path::new("talk.mp4"), "cut-").unwrap(),
            PathBuf::from("cut-talk.mp4")
        );
    }

    #[test]
    fn test_output_path_rejects_directory_like_input() {
        assert!(matches!(
            output_path(Path::new(".."), "outfile_"),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_run_missing_input() {
        let args = Args::parse_from(["shutup", "/nonexistent/dir/talk.mp4"]);
        let err = run(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InputNotFound { .. })
        ));
    }
}
