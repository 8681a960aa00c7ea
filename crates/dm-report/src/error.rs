//! Error types for report processing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, rewriting or writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The report file does not exist.
    #[error("report file {path} does not exist")]
    NotFound { path: PathBuf },

    /// The report is not well-formed XML.
    #[error("malformed XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    /// The report is well-formed but not shaped like a JUnit report.
    #[error("unexpected report structure in {path}: {message}")]
    Structure { path: PathBuf, message: String },

    /// A suite count attribute is not a non-negative number.
    #[error("suite '{suite}' has invalid {attribute}=\"{value}\"")]
    InvalidCount {
        suite: String,
        attribute: String,
        value: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
