use crate::error::{CliError, Result};
use std::fs::File;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

/// Target prefix shared by the engine and the binary.
const IFSQSAR_TARGET: &str = "ifsqsar";

fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// A log file keeps the per-run summaries even when the console only shows warnings.
fn file_level(verbosity: u8) -> LevelFilter {
    console_level(verbosity.max(1), false)
}

/// Verbosity applies to ifsqsar targets; other crates never log below WARN.
fn targets(level: LevelFilter) -> Targets {
    Targets::new()
        .with_target(IFSQSAR_TARGET, level)
        .with_default(level.min(LevelFilter::WARN))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .compact()
        .with_filter(targets(console_level(verbosity, quiet)));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(|source| CliError::LogFile { path, source })?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_filter(targets(file_level(verbosity))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}
