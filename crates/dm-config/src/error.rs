//! Error types for profile resolution and loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving or loading a profile.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No numeric profile is less than or equal to the requested version.
    #[error("no configuration profile found for driver version '{version}'")]
    NotFound { version: String },

    /// The ignore file could not be parsed.
    #[error("invalid ignore file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for profile operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
