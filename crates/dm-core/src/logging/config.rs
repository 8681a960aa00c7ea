//! Log level and format selection.
//!
//! `--log-level` / `--log-format` win over `DM_LOG` / `DM_LOG_FORMAT`; the
//! environment values accept the same names as the flags, case-insensitively.
//! Unknown environment values are ignored with the default kept.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

const ENV_LOG_LEVEL: &str = "DM_LOG";
const ENV_LOG_FORMAT: &str = "DM_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines on stderr
    #[default]
    Human,
    /// One JSON object per event on stderr
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Process environment plus CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let env_level = lookup(ENV_LOG_LEVEL).and_then(|v| LogLevel::from_str(v.trim(), true).ok());
        let env_format =
            lookup(ENV_LOG_FORMAT).and_then(|v| LogFormat::from_str(v.trim(), true).ok());

        let defaults = Self::default();
        Self {
            level: cli_level.or(env_level).unwrap_or(defaults.level),
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            timestamps: defaults.timestamps,
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.level.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn environment_names_match_the_flags() {
        let config = LogConfig::from_lookup(
            env(&[("DM_LOG", "WARN"), ("DM_LOG_FORMAT", "jsonl")]),
            None,
            None,
        );
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Jsonl);
        assert_eq!(config.level_filter(), LevelFilter::WARN);
    }

    #[test]
    fn unknown_environment_values_keep_defaults() {
        let config = LogConfig::from_lookup(
            env(&[("DM_LOG", "quiet"), ("DM_LOG_FORMAT", "pretty")]),
            None,
            None,
        );
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn cli_overrides_win() {
        let config = LogConfig::from_lookup(
            env(&[("DM_LOG", "error"), ("DM_LOG_FORMAT", "human")]),
            Some(LogLevel::Debug),
            Some(LogFormat::Jsonl),
        );
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Jsonl);
    }

    #[test]
    fn off_disables_every_level() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
        assert_eq!(LogConfig::default().level_filter(), LevelFilter::INFO);
    }
}
