//! Per-version run metadata consumed by the result store.
//!
//! One JSON file per driver version, next to its report:
//! `<results_dir>/<version>/metadata_<flavor>_<version>.json`. A successful
//! run points at the report file; a failed run carries the failure reason.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub driver_name: String,
    pub driver_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junit_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn success(settings: &Settings, version: &str) -> Self {
        Self {
            driver_name: settings.driver_name(version),
            driver_type: settings.driver_type.clone(),
            junit_result: Some(format!("./{}", settings.report_file_name(version))),
            failure_reason: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failure(settings: &Settings, version: &str, reason: impl Into<String>) -> Self {
        Self {
            driver_name: settings.driver_name(version),
            driver_type: settings.driver_type.clone(),
            junit_result: None,
            failure_reason: Some(reason.into()),
            generated_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure_reason.is_some()
    }

    /// Write as JSON, replacing any previous file atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(self)?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("metadata.json");
        let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&content)?;
            let _ = file.sync_all();
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Location of the metadata file for a driver version.
pub fn metadata_path(settings: &Settings, version: &str) -> PathBuf {
    settings
        .report_dir(version)
        .join(format!("metadata_{}.json", settings.driver_name(version)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn success_points_at_report() {
        let meta = RunMetadata::success(&Settings::default(), "3.22.0");
        assert_eq!(meta.driver_name, "scylla_3.22.0");
        assert_eq!(meta.driver_type, "csharp");
        assert_eq!(meta.junit_result.as_deref(), Some("./scylla_3.22.0.xml"));
        assert!(!meta.is_failure());

        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("failure_reason").is_none());
    }

    #[test]
    fn failure_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            results_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let path = metadata_path(&settings, "3.21.0");
        assert!(path.ends_with("3.21.0/metadata_scylla_3.21.0.json"));

        let meta = RunMetadata::failure(&settings, "3.21.0", "report missing");
        meta.write(&path).unwrap();
        let read = RunMetadata::read(&path).unwrap();
        assert_eq!(read, meta);
        assert!(read.junit_result.is_none());
    }
}
