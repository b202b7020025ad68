//! Process-level error types
//!
//! Only two failure classes abort the whole benchmark: a bad configuration
//! and an output that cannot be written. Session and per-run failures are
//! degraded into row data instead, see [`crate::session`].

use thiserror::Error;

/// Fatal benchmark error
#[derive(Debug, Error)]
pub enum BenchError {
    /// Configuration rejected before the run started
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The persisted results could not be written
    #[error("output error: {0}")]
    Output(#[from] crate::output::OutputError),

    /// A required component was not supplied to the builder
    #[error("missing component: {0}")]
    Missing(&'static str),
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
