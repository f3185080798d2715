//! Configuration file management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shapley_store::StoreConfig;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the default ledger image inside the data directory.
pub const LEDGER_FILE: &str = "ledger.json";

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Ledger location.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Submitting account.
    #[serde(default)]
    pub account: AccountConfig,
    /// Record store switches.
    #[serde(default)]
    pub store: StoreConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger image path. Empty = $data_dir/ledger.json.
    #[serde(default)]
    pub path: String,
}

/// Account configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Address recorded as the advertiser of new records.
    #[serde(default)]
    pub advertiser: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error". `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Load `config.toml` from `data_dir`, falling back to defaults if it
    /// does not exist.
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolved ledger image path.
    pub fn ledger_path(&self, data_dir: &Path) -> PathBuf {
        if self.ledger.path.is_empty() {
            data_dir.join(LEDGER_FILE)
        } else {
            PathBuf::from(&self.ledger.path)
        }
    }
}

/// Default data directory: `$HOME/.shapley`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(".shapley"))
        .unwrap_or_else(|_| PathBuf::from(".shapley"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.ledger.path.is_empty());
        assert!(config.account.advertiser.is_empty());
        assert!(!config.store.check_availability_on_list);
        assert_eq!(config.advanced.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = CliConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: CliConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [account]
            advertiser = "0xabc"

            [store]
            check_availability_on_list = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.account.advertiser, "0xabc");
        assert!(config.store.check_availability_on_list);
        assert_eq!(config.advanced.log_level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = CliConfig::load(dir.path()).expect("load");
        assert_eq!(config.ledger_path(dir.path()), dir.path().join(LEDGER_FILE));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[ledger]\npath = \"/srv/ledger.json\"\n[advanced]\nlog_level = \"debug\"\n",
        )
        .expect("write config");
        let config = CliConfig::load(dir.path()).expect("load");
        assert_eq!(
            config.ledger_path(dir.path()),
            PathBuf::from("/srv/ledger.json")
        );
        assert_eq!(config.advanced.log_level, "debug");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "[ledger\n").expect("write config");
        assert!(CliConfig::load(dir.path()).is_err());
    }
}
