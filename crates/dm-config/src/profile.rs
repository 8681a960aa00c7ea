//! Profile discovery on disk.
//!
//! Layout: `<root>/<profile-id>/` where a profile directory holds
//! `patch*` files (applied in name order) and an optional `ignore.yaml`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::ignore::IgnoreProfile;
use crate::version::{resolve_with_default, DEFAULT_PROFILE};
use crate::{ConfigError, Result};

/// Prefix that marks a file in a profile directory as a patch.
const PATCH_PREFIX: &str = "patch";

/// A resolved configuration profile.
#[derive(Debug, Clone, Serialize)]
pub struct VersionProfile {
    /// Profile identifier (a released version or a label such as `master`).
    pub id: String,
    /// Directory the profile was loaded from.
    pub dir: PathBuf,
    /// Patch file names, in application order.
    pub patches: Vec<String>,
    /// Ignore and flaky lists.
    pub ignore: IgnoreProfile,
}

/// Directory-backed set of profiles for one driver flavor.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
    default_profile: String,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Override the profile used for labels without a profile of their own.
    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_profile = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifiers of every profile directory under the root.
    pub fn available(&self) -> Result<BTreeSet<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| ConfigError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut ids = BTreeSet::new();
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.insert(name.to_string());
                }
            }
        }
        Ok(ids)
    }

    /// Resolve a driver version label and load the selected profile.
    pub fn resolve(&self, target: &str) -> Result<VersionProfile> {
        let available = self.available()?;
        let id = resolve_with_default(target, &available, &self.default_profile)?;
        let profile = self.load(&id)?;

        info!(
            target: "profile.resolved",
            version = target,
            profile = %profile.id,
            patches = profile.patches.len(),
            ignored = profile.ignore.ignore.len(),
            "Resolved configuration profile"
        );
        Ok(profile)
    }

    /// Load a profile by identifier.
    pub fn load(&self, id: &str) -> Result<VersionProfile> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            warn!(
                target: "profile.missing_dir",
                path = %dir.display(),
                "Profile directory does not exist; using an empty profile"
            );
            return Ok(VersionProfile {
                id: id.to_string(),
                dir,
                patches: Vec::new(),
                ignore: IgnoreProfile::default(),
            });
        }

        let patches = list_patches(&dir)?;
        let ignore = IgnoreProfile::load(&dir)?;
        Ok(VersionProfile {
            id: id.to_string(),
            dir,
            patches,
            ignore,
        })
    }
}

/// Patch file names in a profile directory, sorted.
fn list_patches(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut patches: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with(PATCH_PREFIX))
        .collect();
    patches.sort();
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_only_directories() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("1.0.0")).unwrap();
        std::fs::create_dir(root.path().join("master")).unwrap();
        std::fs::write(root.path().join("README.md"), "x").unwrap();

        let ids = ProfileStore::new(root.path()).available().unwrap();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["1.0.0".to_string(), "master".to_string()]
        );
    }

    #[test]
    fn patches_sorted_and_filtered() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("1.0.0");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("patch_b"), "").unwrap();
        std::fs::write(dir.join("patch_a"), "").unwrap();
        std::fs::write(dir.join("ignore.yaml"), "").unwrap();

        let profile = ProfileStore::new(root.path()).load("1.0.0").unwrap();
        assert_eq!(profile.patches, vec!["patch_a", "patch_b"]);
    }

    #[test]
    fn missing_root_is_io_error() {
        let root = TempDir::new().unwrap();
        let store = ProfileStore::new(root.path().join("nope"));
        assert!(matches!(store.available(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn default_profile_without_directory_is_empty() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("1.0.0")).unwrap();

        let profile = ProfileStore::new(root.path()).resolve("feature").unwrap();
        assert_eq!(profile.id, "master");
        assert!(profile.patches.is_empty());
        assert!(profile.ignore.ignore.is_empty());
    }
}
