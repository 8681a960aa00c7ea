//! Driver matrix configuration profiles.
//!
//! This crate provides:
//! - Version resolution onto the nearest available profile directory
//! - Ignore/flaky test lists loaded from `ignore.yaml`
//! - Profile discovery (patch files + ignore list) on disk

pub mod error;
pub mod ignore;
pub mod profile;
pub mod version;

pub use error::{ConfigError, Result};
pub use ignore::IgnoreProfile;
pub use profile::{ProfileStore, VersionProfile};
pub use version::{is_strict_version, resolve, resolve_with_default, DEFAULT_PROFILE};
