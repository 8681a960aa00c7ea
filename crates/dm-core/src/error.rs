//! Unified error type for the driver matrix CLI.

use dm_config::ConfigError;
use dm_report::ReportError;
use thiserror::Error;

use crate::config::SettingsError;
use crate::exit_codes::ExitCode;

/// Result type alias for driver matrix operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Profile(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("invalid arguments: {0}")]
    Args(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Exit code reported when this error ends the process.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Profile(ConfigError::Parse { .. }) => ExitCode::ParseError,
            Error::Profile(ConfigError::Io { .. }) => ExitCode::IoError,
            Error::Profile(ConfigError::NotFound { .. }) => ExitCode::ConfigError,
            Error::Settings(_) => ExitCode::ConfigError,
            Error::Report(ReportError::NotFound { .. }) => ExitCode::ReportError,
            Error::Report(
                ReportError::Xml { .. }
                | ReportError::Structure { .. }
                | ReportError::InvalidCount { .. },
            ) => ExitCode::ParseError,
            Error::Report(ReportError::Io { .. }) | Error::Io(_) => ExitCode::IoError,
            Error::Report(ReportError::Json(_)) | Error::Json(_) => ExitCode::InternalError,
            Error::Args(_) => ExitCode::ArgsError,
        }
    }
}
