//! Structured logging for dm-core.
//!
//! All log output goes to stderr, either human-readable or JSON lines;
//! stdout is reserved for command payloads. Library crates emit `tracing`
//! events with dotted targets (`profile.resolved`, `report.reclassified`, ...).

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Processing stages of one matrix iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and settings resolution.
    Init,
    /// Version → profile resolution.
    Resolve,
    /// Classname tagging of the raw report.
    Tag,
    /// Aggregation, reclassification and report writing.
    Process,
    /// Metadata and results output.
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::Resolve => write!(f, "resolve"),
            Stage::Tag => write!(f, "tag"),
            Stage::Process => write!(f, "process"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

/// Initialize the logging subsystem.
///
/// RUST_LOG, when set, replaces the configured level. Calling this more than
/// once keeps the first subscriber.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level_filter().to_string()));

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!(target: "logging.init", "Logging already initialized");
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid.simple().to_string()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(id1.starts_with("run-"));
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 16);
        assert!(id1[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Resolve).unwrap(), "\"resolve\"");
        assert_eq!(Stage::Process.to_string(), "process");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(&LogConfig::default());
        init_logging(&LogConfig {
            format: LogFormat::Jsonl,
            ..LogConfig::default()
        });
    }
}
