//! Ignore and flaky test lists for a profile.
//!
//! A profile directory may carry an `ignore.yaml`:
//!
//! ```yaml
//! tests:
//!   ignore:
//!     - Cassandra.IntegrationTests.Core.PoolTests.Should_Reconnect
//!   flaky:
//!     - Cassandra.IntegrationTests.Core.TimeoutTests.Should_Timeout
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ConfigError, Result};

/// File name of the ignore list inside a profile directory.
pub const IGNORE_FILENAME: &str = "ignore.yaml";

/// Tests whose failures are expected for a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreProfile {
    /// Failures of these tests do not count against the run.
    #[serde(default)]
    pub ignore: BTreeSet<String>,

    /// Known-unstable tests. Informational only.
    #[serde(default)]
    pub flaky: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IgnoreFile {
    #[serde(default)]
    tests: Option<IgnoreProfile>,
}

impl IgnoreProfile {
    /// Load `ignore.yaml` from a profile directory.
    ///
    /// A missing file is not an error: the profile simply ignores nothing.
    pub fn load(profile_dir: &Path) -> Result<Self> {
        let path = profile_dir.join(IGNORE_FILENAME);
        if !path.exists() {
            info!(
                target: "profile.ignore_missing",
                path = %path.display(),
                "No ignore file for profile"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let profile = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        if profile.ignore.is_empty() {
            info!(
                target: "profile.ignore_empty",
                path = %path.display(),
                "Ignore file doesn't contain any test to ignore"
            );
        }
        Ok(profile)
    }

    /// Parse the YAML body of an ignore file.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: Option<IgnoreFile> = serde_yaml::from_str(content)?;
        Ok(file.and_then(|f| f.tests).unwrap_or_default())
    }

    /// Whether a fully-qualified test identifier is in the ignore set.
    pub fn is_ignored(&self, test: &str) -> bool {
        self.ignore.contains(test)
    }

    /// Exclusion filter for the external test runner, one clause per ignored test.
    ///
    /// Returns an empty string when nothing is ignored.
    pub fn test_filter(&self) -> String {
        self.ignore
            .iter()
            .map(|test| format!("FullyQualifiedName!~{test}"))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_profile() {
        let dir = TempDir::new().unwrap();
        let profile = IgnoreProfile::load(dir.path()).unwrap();
        assert!(profile.ignore.is_empty());
        assert!(profile.flaky.is_empty());
    }

    #[test]
    fn loads_ignore_and_flaky() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(IGNORE_FILENAME),
            "tests:\n  ignore:\n    - A.B.c\n    - A.B.d\n  flaky:\n    - X.Y.z\n",
        )
        .unwrap();

        let profile = IgnoreProfile::load(dir.path()).unwrap();
        assert!(profile.is_ignored("A.B.c"));
        assert!(profile.is_ignored("A.B.d"));
        assert!(!profile.is_ignored("X.Y.z"));
        assert!(profile.flaky.contains("X.Y.z"));
    }

    #[test]
    fn empty_or_partial_content_is_empty_profile() {
        assert_eq!(IgnoreProfile::from_yaml("").unwrap(), IgnoreProfile::default());
        assert_eq!(IgnoreProfile::from_yaml("tests:\n").unwrap(), IgnoreProfile::default());
        assert_eq!(
            IgnoreProfile::from_yaml("other: 1\n").unwrap(),
            IgnoreProfile::default()
        );

        let only_flaky = IgnoreProfile::from_yaml("tests:\n  flaky: [a]\n").unwrap();
        assert!(only_flaky.ignore.is_empty());
        assert_eq!(only_flaky.flaky.len(), 1);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(IGNORE_FILENAME), "tests:\n  ignore: [unterminated\n")
            .unwrap();

        let err = IgnoreProfile::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        assert!(IgnoreProfile::from_yaml("tests:\n  ignore: 42\n").is_err());
    }

    #[test]
    fn test_filter_joins_clauses() {
        let profile = IgnoreProfile::from_yaml("tests:\n  ignore: [B.t2, A.t1]\n").unwrap();
        assert_eq!(
            profile.test_filter(),
            "FullyQualifiedName!~A.t1 | FullyQualifiedName!~B.t2"
        );
        assert_eq!(IgnoreProfile::default().test_filter(), "");
    }
}
