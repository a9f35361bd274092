//! Structured logging through tracing-subscriber.
//!
//! The binaries call [`init`] once, after configuration and `--debug` are
//! resolved. Output goes to stderr; stdout carries only command results
//! (the round-trip summary).

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Where the filter directives came from. Reported once logging is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    Configured,
    RustLog,
}

/// Build the subscriber filter.
///
/// `level` is a bare level (`"warn"`) or an `EnvFilter` directive
/// (`"case_dfxml=debug,oxigraph=warn"`). With `prefer_level`, `level` wins
/// and `RUST_LOG` is consulted only when `level` does not parse; without it,
/// `RUST_LOG` wins when set.
pub fn build_filter(level: &str, prefer_level: bool) -> Result<(EnvFilter, FilterSource), AppError> {
    let configured = EnvFilter::try_new(level);
    if prefer_level {
        return match configured {
            Ok(filter) => Ok((filter, FilterSource::Configured)),
            Err(level_err) => EnvFilter::try_from_default_env()
                .map(|f| (f, FilterSource::RustLog))
                .map_err(|env_err| {
                    AppError::Logger(format!(
                        "invalid log level '{level}': {level_err}; RUST_LOG unusable: {env_err}"
                    ))
                }),
        };
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok((filter, FilterSource::RustLog)),
        Err(_) => configured
            .map(|f| (f, FilterSource::Configured))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}"))),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let (filter, source) = build_filter(level, prefer_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    tracing::debug!(?source, level, "logging initialised");
    Ok(())
}

/// `--debug` wins over the configured level.
pub fn effective_level(debug: bool, configured: &str) -> &str {
    if debug { "debug" } else { configured }
}

/// Parse a bare level name.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

/// Accept a bare level or a directive list; reject anything else before
/// the subscriber is built.
pub fn validate_level(level: &str) -> Result<(), AppError> {
    if parse_level(level).is_ok() {
        return Ok(());
    }
    if level.contains('=') && EnvFilter::try_new(level).is_ok() {
        return Ok(());
    }
    Err(AppError::Logger(format!(
        "'{level}' is neither a log level (error, warn, info, debug, trace, off) nor a filter directive"
    )))
}
