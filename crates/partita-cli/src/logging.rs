//! Subscriber setup for the `partita` binary.

use std::env;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
pub enum LoggingError {
    InvalidFilter(String),
    InvalidFormat(String),
    LogFile { path: String, reason: String },
    Init(String),
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingError::InvalidFilter(reason) => write!(f, "Invalid log filter: {reason}"),
            LoggingError::InvalidFormat(value) => write!(
                f,
                "Invalid PARTITA_LOG_FORMAT '{value}' (expected 'json' or 'pretty')"
            ),
            LoggingError::LogFile { path, reason } => {
                write!(f, "Failed to open log file {path}: {reason}")
            }
            LoggingError::Init(reason) => write!(f, "Failed to initialize logging: {reason}"),
        }
    }
}

impl std::error::Error for LoggingError {}

fn open_log_file(path: &str) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| LoggingError::LogFile {
            path: path.to_string(),
            reason: err.to_string(),
        })
}

fn map_init_err<E: fmt::Display>(err: E) -> LoggingError {
    LoggingError::Init(err.to_string())
}

/// Build the event filter from `level`, falling back to `PARTITA_TRACE` and
/// then `info`.
pub fn build_filter(level: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var("PARTITA_TRACE").ok())
        .unwrap_or_else(|| "info".to_string());

    if level_value.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
    }
    EnvFilter::try_new(&level_value).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
}

/// Install a stderr subscriber, plus a file layer when `PARTITA_LOG_FILE` is
/// set. Returns false when a subscriber was already installed.
pub fn init(level: Option<&str>) -> Result<bool, LoggingError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let filter = build_filter(level)?;
    let format = env::var("PARTITA_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let log_file = env::var("PARTITA_LOG_FILE").ok();
    let use_json = format.eq_ignore_ascii_case("json");

    if !use_json && !format.eq_ignore_ascii_case("pretty") {
        return Err(LoggingError::InvalidFormat(format));
    }

    if use_json {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .json();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        if let Some(path) = log_file {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(open_log_file(&path)?)
                .with_ansi(false)
                .json();
            base.with(file_layer).try_init().map_err(map_init_err)?;
        } else {
            base.try_init().map_err(map_init_err)?;
        }
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .pretty();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        if let Some(path) = log_file {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(open_log_file(&path)?)
                .with_ansi(false)
                .pretty();
            base.with(file_layer).try_init().map_err(map_init_err)?;
        } else {
            base.try_init().map_err(map_init_err)?;
        }
    }

    Ok(true)
}
