//! Error types for the HH4b selection

use thiserror::Error;

/// Selection error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Configuration error (raised while building cuts, regions or selections)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scalar column required by a predicate is not in the event table
    #[error("missing column: '{0}'")]
    MissingColumn(String),

    /// An object collection required by a predicate is not in the event table
    #[error("missing collection: '{0}'")]
    MissingCollection(String),

    /// Malformed event table or mask shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Absent values reached a mask that must be fully defined
    #[error("undefined mask entries in '{cut}': {count} absent value(s)")]
    UndefinedMask {
        /// Cut (or region) that produced the mask.
        cut: String,
        /// Number of absent entries found.
        count: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
