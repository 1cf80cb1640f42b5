//! Service configuration.
//!
//! Read from a TOML file with kebab-case keys. Every key is optional.

use super::codec::DEFAULT_SYNTHETIC_ID_PREFIX;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Directory of the sled database holding documents and stock levels.
    pub store_path: PathBuf,
    /// Bech32 prefix for newly generated shipment ids.
    pub shipment_id_prefix: String,
    /// Prepended to the external document id when a document carries no
    /// shipment id of its own.
    pub synthetic_id_prefix: String,
    pub restore_stock_on_cancel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("shipments.db"),
            shipment_id_prefix: "ship".into(),
            synthetic_id_prefix: DEFAULT_SYNTHETIC_ID_PREFIX.into(),
            restore_stock_on_cancel: true,
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.shipment_id_prefix.is_empty() {
            anyhow::bail!("shipment-id-prefix must not be empty");
        }
        Ok(config)
    }
}
