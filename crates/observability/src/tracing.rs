//! Tracing/logging initialization.
//!
//! One global `fmt` subscriber, filtered by an `EnvFilter` directive string.
//! JSON output is the default; plain text is meant for local runs.

use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const FILTER_VAR: &str = "RUST_LOG";
pub const FORMAT_VAR: &str = "STOCKMASTER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Plain,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "plain" | "text" | "pretty" => Ok(Self::Plain),
            other => bail!("unknown log format {other:?} (expected \"json\" or \"plain\")"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,stockmaster_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
            with_target: false,
        }
    }
}

impl ObservabilityConfig {
    /// Read `RUST_LOG` and `STOCKMASTER_LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(filter) = lookup(FILTER_VAR).filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup(FORMAT_VAR) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process from the environment.
///
/// An unreadable environment falls back to the defaults.
pub fn init() {
    let config = ObservabilityConfig::from_env().unwrap_or_default();
    init_with(&config);
}

/// Install the global subscriber described by `config`.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is kept.
pub fn init_with(config: &ObservabilityConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(config.with_target);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Plain => builder.try_init().is_ok(),
    };
    if installed {
        ::tracing::debug!(filter = %config.filter, format = ?config.format, "tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_to_json_at_info() {
        let config = ObservabilityConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ObservabilityConfig::default());
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "info");
    }

    #[test]
    fn environment_overrides_filter_and_format() {
        let config = ObservabilityConfig::from_lookup(lookup(&[
            (FILTER_VAR, "warn,stockmaster_infra=debug"),
            (FORMAT_VAR, "Plain"),
        ]))
        .unwrap();
        assert_eq!(config.filter, "warn,stockmaster_infra=debug");
        assert_eq!(config.format, LogFormat::Plain);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = ObservabilityConfig::from_lookup(lookup(&[(FORMAT_VAR, "xml")])).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ObservabilityConfig = serde_json::from_str(r#"{"format": "plain"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Plain);
        assert_eq!(config.filter, "info");
    }

    #[test]
    fn second_init_is_a_no_op() {
        let config = ObservabilityConfig {
            filter: "bogus=[".to_string(),
            ..ObservabilityConfig::default()
        };
        // The first call may lose to another test's subscriber; the second never installs.
        init_with(&config);
        assert!(!init_with(&config));
        init();
    }
}
