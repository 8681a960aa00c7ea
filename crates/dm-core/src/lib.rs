//! Driver matrix core: configuration, logging and the per-version run loop
//! around the profile resolver and the report processor.

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod matrix;
pub mod metadata;
pub mod output;

pub use error::{Error, Result};
