//! Version label → profile identifier resolution.
//!
//! Numeric labels (`major.minor.patch`) resolve to the newest numeric profile
//! that is not greater than the target. Anything else (branch names,
//! pre-release tags) resolves to a profile with the same literal name, or to
//! the default profile.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::{ConfigError, Result};

/// Profile used when a non-numeric label has no profile of its own.
pub const DEFAULT_PROFILE: &str = "master";

static RE_STRICT_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

/// Parse a label as a strict `major.minor.patch` version.
fn parse_strict(label: &str) -> Option<Version> {
    if !RE_STRICT_VERSION.is_match(label) {
        return None;
    }
    // semver rejects leading zeros ("01.2.3"); those are treated as labels.
    Version::parse(label).ok()
}

/// Whether `label` is a strict numeric `major.minor.patch` version.
pub fn is_strict_version(label: &str) -> bool {
    parse_strict(label).is_some()
}

/// Resolve `target` against the available profile ids using [`DEFAULT_PROFILE`].
pub fn resolve(target: &str, available: &BTreeSet<String>) -> Result<String> {
    resolve_with_default(target, available, DEFAULT_PROFILE)
}

/// Resolve `target` against the available profile ids.
///
/// Returns the identifier of the selected profile. Only a numeric target can
/// fail, when every numeric profile is newer than it.
pub fn resolve_with_default(
    target: &str,
    available: &BTreeSet<String>,
    default_profile: &str,
) -> Result<String> {
    let Some(target_version) = parse_strict(target) else {
        if available.contains(target) {
            debug!(target: "profile.resolve", label = target, "Exact profile match for label");
            return Ok(target.to_string());
        }
        debug!(
            target: "profile.resolve",
            label = target,
            fallback = default_profile,
            "No profile for label, using default"
        );
        return Ok(default_profile.to_string());
    };

    let mut candidates: Vec<(Version, &String)> = available
        .iter()
        .filter_map(|id| parse_strict(id).map(|v| (v, id)))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    candidates
        .into_iter()
        .find(|(v, _)| *v <= target_version)
        .map(|(_, id)| id.clone())
        .ok_or_else(|| ConfigError::NotFound {
            version: target.to_string(),
        })
}
