//! Engine configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use stockmaster_inventory::reference::{DELIVERY_PREFIX, RECEIPT_PREFIX};

/// Tunables of the stock engine.
///
/// Every field has a default, so a partial JSON/TOML document (or none) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a unit of work is re-run after a retryable commit
    /// failure before the caller sees `Conflict`.
    pub max_conflict_retries: u32,
    /// Highest `-n` suffix tried when a reference number is taken.
    pub max_reference_suffix: u32,
    pub receipt_prefix: String,
    pub delivery_prefix: String,
    /// Ledger note for adjustments posted without a reason.
    pub default_adjustment_note: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            max_reference_suffix: 999,
            receipt_prefix: RECEIPT_PREFIX.to_string(),
            delivery_prefix: DELIVERY_PREFIX.to_string(),
            default_adjustment_note: "Manual stock adjustment".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `STOCKMASTER_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("STOCKMASTER_MAX_CONFLICT_RETRIES") {
            config.max_conflict_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid STOCKMASTER_MAX_CONFLICT_RETRIES: {raw:?}"))?;
        }
        if let Some(raw) = lookup("STOCKMASTER_MAX_REFERENCE_SUFFIX") {
            config.max_reference_suffix = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid STOCKMASTER_MAX_REFERENCE_SUFFIX: {raw:?}"))?;
        }
        if let Some(raw) = lookup("STOCKMASTER_RECEIPT_PREFIX") {
            config.receipt_prefix = raw;
        }
        if let Some(raw) = lookup("STOCKMASTER_DELIVERY_PREFIX") {
            config.delivery_prefix = raw;
        }
        if let Some(raw) = lookup("STOCKMASTER_DEFAULT_ADJUSTMENT_NOTE") {
            config.default_adjustment_note = raw;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.receipt_prefix.trim().is_empty(),
            "receipt prefix cannot be empty"
        );
        anyhow::ensure!(
            !self.delivery_prefix.trim().is_empty(),
            "delivery prefix cannot be empty"
        );
        anyhow::ensure!(
            self.receipt_prefix != self.delivery_prefix,
            "receipt and delivery prefixes must differ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.receipt_prefix, "RCV");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("STOCKMASTER_MAX_CONFLICT_RETRIES", "7"),
            ("STOCKMASTER_DELIVERY_PREFIX", "OUT"),
        ]))
        .unwrap();
        assert_eq!(config.max_conflict_retries, 7);
        assert_eq!(config.delivery_prefix, "OUT");
        assert_eq!(config.max_reference_suffix, 999);
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = EngineConfig::from_lookup(lookup(&[("STOCKMASTER_MAX_REFERENCE_SUFFIX", "lots")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("STOCKMASTER_MAX_REFERENCE_SUFFIX"));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_conflict_retries": 0}"#).unwrap();
        assert_eq!(config.max_conflict_retries, 0);
        assert_eq!(config.default_adjustment_note, "Manual stock adjustment");
    }
}
