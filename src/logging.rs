use std::path::Path;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Prefix of the daily log files.
pub const LOG_FILE_NAME: &str = "qr-dance.log";

/// Maps the `-v` count to the lowest level shown. Errors and warnings are
/// always shown.
#[must_use]
pub const fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Installs the global subscriber. Logs always go to stderr, stdout is
/// left for base64 output. With `log_dir` they are also written to daily
/// files there; if that fails, logging falls back to stderr only.
///
/// The returned guard flushes the file writer and must be held until exit.
///
/// # Errors
///
/// Returns an error if no subscriber can be installed.
pub fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = level_for(verbosity);
    if let Some(dir) = log_dir {
        match try_setup_file_logging(level, dir) {
            Ok(guard) => return Ok(Some(guard)),
            Err(e) => {
                eprintln!("Warning: Could not set up file logging ({e:#}), using stderr only");
            }
        }
    }
    setup_stderr_logging(level)?;
    Ok(None)
}

fn setup_stderr_logging(level: LevelFilter) -> Result<()> {
    let subscriber = tracing_subscriber::registry().with(env_filter(level)).with(
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set up stderr logging")?;

    Ok(())
}

fn try_setup_file_logging(level: LevelFilter, dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(true),
        )
        .with(
            fmt::Layer::new()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_line_number(true)
                .with_ansi(false),
        );

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set up file logging")?;

    Ok(guard)
}
