//! Error types for the parallax tracking library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Lookup of a depth layer id or name that is not in the layer table
    #[error("Invalid layer: {0}")]
    InvalidLayer(String),

    /// Capture device or landmark inference channel could not be brought up
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Inference worker could not be started or its channel closed
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
