//! Error types for the lull_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lull_core operations.
///
/// The evaluation pipeline itself never fails; these variants only surface
/// at the edges (store, config, export, argument parsing).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event store error
    #[error("Store error: {0}")]
    Store(String),

    /// Malformed user input (event type, time string)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
