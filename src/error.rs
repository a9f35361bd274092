//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    /// Unparseable DFXML input or a failure while writing DFXML.
    #[error("dfxml error: {0}")]
    Dfxml(String),

    /// Triple-store, query, or graph serialization failure.
    #[error("graph error: {0}")]
    Graph(String),

    /// Unknown or unsupported graph serialization format.
    #[error("format error: {0}")]
    Format(String),

    /// Round-trip validation found information that changed in translation.
    #[error("round-trip divergence: {0}")]
    Divergence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
