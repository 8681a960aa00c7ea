//! Settings loading for dm-core.
//!
//! Resolution order for the settings file:
//! 1. Explicit `--config` path
//! 2. `DM_CONFIG` (file path)
//! 3. `DM_CONFIG_DIR/config.toml`
//! 4. XDG config (`~/.config/driver-matrix/config.toml`)
//! 5. Built-in defaults
//!
//! `DM_VERSIONS_DIR` and `DM_RESULTS_DIR` then override the file values, and
//! CLI flags override everything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const ENV_CONFIG_PATH: &str = "DM_CONFIG";
const ENV_CONFIG_DIR: &str = "DM_CONFIG_DIR";
const ENV_VERSIONS_DIR: &str = "DM_VERSIONS_DIR";
const ENV_RESULTS_DIR: &str = "DM_RESULTS_DIR";

const CONFIG_FILENAME: &str = "config.toml";
const APP_NAME: &str = "driver-matrix";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the settings were loaded from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    CliArgument,
    Environment,
    XdgConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsSource::CliArgument => write!(f, "CLI argument"),
            SettingsSource::Environment => write!(f, "environment variable"),
            SettingsSource::XdgConfig => write!(f, "XDG config"),
            SettingsSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Driver matrix settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the profile tree (`<versions_dir>/<flavor>/<profile>`).
    pub versions_dir: PathBuf,
    /// Root of the report tree (`<results_dir>/<version>/<flavor>_<version>.xml`).
    pub results_dir: PathBuf,
    /// Driver flavor, selects the profile subtree and names report files.
    pub flavor: String,
    /// Driver kind recorded in run metadata.
    pub driver_type: String,
    /// Profile for version labels without a profile of their own.
    pub default_profile: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            versions_dir: PathBuf::from("versions"),
            results_dir: PathBuf::from("test_results"),
            flavor: "scylla".to_string(),
            driver_type: "csharp".to_string(),
            default_profile: dm_config::DEFAULT_PROFILE.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `DM_VERSIONS_DIR` / `DM_RESULTS_DIR` style overrides.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_VERSIONS_DIR) {
            self.versions_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_RESULTS_DIR) {
            self.results_dir = PathBuf::from(dir);
        }
    }

    /// Directory holding the profiles of the configured flavor.
    pub fn profile_root(&self) -> PathBuf {
        self.versions_dir.join(&self.flavor)
    }

    /// Directory holding the report and metadata of one driver version.
    pub fn report_dir(&self, version: &str) -> PathBuf {
        self.results_dir.join(version)
    }

    /// `<flavor>_<version>`, the stem of report and metadata names.
    pub fn driver_name(&self, version: &str) -> String {
        format!("{}_{}", self.flavor, version)
    }

    pub fn report_file_name(&self, version: &str) -> String {
        format!("{}.xml", self.driver_name(version))
    }

    pub fn report_path(&self, version: &str) -> PathBuf {
        self.report_dir(version).join(self.report_file_name(version))
    }
}

/// Settings together with their provenance.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub path: Option<PathBuf>,
    pub source: SettingsSource,
}

/// Resolve and load the settings file, then apply environment overrides.
pub fn load_settings(cli_path: Option<&Path>) -> Result<LoadedSettings, SettingsError> {
    let (path, source) = resolve_settings_path(cli_path)?;
    let mut settings = match &path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    settings.apply_env_overrides(|key| std::env::var(key).ok());

    debug!(
        target: "settings.loaded",
        source = %source,
        path = ?path,
        versions_dir = %settings.versions_dir.display(),
        results_dir = %settings.results_dir.display(),
        "Settings resolved"
    );
    Ok(LoadedSettings {
        settings,
        path,
        source,
    })
}

fn resolve_settings_path(
    cli_path: Option<&Path>,
) -> Result<(Option<PathBuf>, SettingsSource), SettingsError> {
    if let Some(path) = cli_path {
        if !path.is_file() {
            return Err(SettingsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok((Some(path.to_path_buf()), SettingsSource::CliArgument));
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok((Some(path), SettingsSource::Environment));
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.is_file() {
            return Ok((Some(path), SettingsSource::Environment));
        }
    }

    if let Some(path) = xdg_config_path().filter(|p| p.is_file()) {
        return Ok((Some(path), SettingsSource::XdgConfig));
    }

    Ok((None, SettingsSource::BuiltinDefault))
}

/// XDG location of the settings file.
pub fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join(CONFIG_FILENAME))
}
