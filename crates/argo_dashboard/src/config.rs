//! Dashboard configuration file handling
//!
//! The dashboard reads an optional `argo.toml`:
//!
//! ```toml
//! [runtime]
//! broadcast_full_state = false
//!
//! [fuel]
//! jarak = 120.0      # km driven
//! konsumsi = 40.0    # km per litre
//! harga = 10000.0    # price per litre
//!
//! [settings]
//! currency = "IDR"
//! platforms = ["gojek", "grab"]
//! ```
//!
//! Every section and field may be omitted.

use anyhow::{Context, Result};
use argo_core::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up by [`DashboardConfig::load_from_dir`]
pub const CONFIG_FILE: &str = "argo.toml";

/// Platforms tracked when the config does not list any
pub const DEFAULT_PLATFORMS: [&str; 4] = ["gojek", "grab", "maxim", "shopee"];

/// Contents of `argo.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub fuel: FuelDefaults,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Starting values of the fuel calculator
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FuelDefaults {
    /// Distance driven, km
    #[serde(default)]
    pub jarak: f64,
    /// Consumption, km per litre
    #[serde(default = "default_konsumsi")]
    pub konsumsi: f64,
    /// Price per litre
    #[serde(default = "default_harga")]
    pub harga: f64,
}

fn default_konsumsi() -> f64 {
    40.0
}

fn default_harga() -> f64 {
    10_000.0
}

impl Default for FuelDefaults {
    fn default() -> Self {
        Self {
            jarak: 0.0,
            konsumsi: default_konsumsi(),
            harga: default_harga(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SettingsConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub auto_save: bool,
}

fn default_currency() -> String {
    "IDR".to_string()
}

fn default_platforms() -> Vec<String> {
    DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            platforms: default_platforms(),
            auto_save: false,
        }
    }
}

impl DashboardConfig {
    /// Load from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `argo.toml` from `dir`, falling back to defaults when it is absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("no {} in {}, using defaults", CONFIG_FILE, dir.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(content)?;
        if config.fuel.konsumsi <= 0.0 {
            anyhow::bail!("fuel.konsumsi must be positive, got {}", config.fuel.konsumsi);
        }
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DashboardConfig::parse("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert!(config.runtime.broadcast_full_state);
        assert_eq!(config.settings.platforms.len(), 4);
        assert_eq!(config.fuel.konsumsi, 40.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = DashboardConfig::parse(
            r#"
            [runtime]
            broadcast_full_state = false

            [fuel]
            jarak = 120.0

            [settings]
            platforms = ["gojek", "grab"]
            "#,
        )
        .unwrap();

        assert!(!config.runtime.broadcast_full_state);
        assert_eq!(config.runtime.state_change_topic, "state:change");
        assert_eq!(config.fuel.jarak, 120.0);
        assert_eq!(config.fuel.harga, 10_000.0);
        assert_eq!(config.settings.platforms, vec!["gojek", "grab"]);
        assert_eq!(config.settings.currency, "IDR");
    }

    #[test]
    fn test_rejects_non_positive_consumption() {
        let err = DashboardConfig::parse("[fuel]\nkonsumsi = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("konsumsi"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = DashboardConfig::default();
        config.fuel.jarak = 80.0;
        let text = config.to_toml().unwrap();
        assert_eq!(DashboardConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_in_dir_is_default() {
        let dir = std::env::temp_dir().join("argo-config-test-missing");
        let config = DashboardConfig::load_from_dir(&dir).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }
}
