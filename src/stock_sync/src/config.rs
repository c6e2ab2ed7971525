//! Runtime configuration: parsing and loading.
//!
//! A TOML file where every key is optional:
//!
//! ```toml
//! database_url = "stock_sync.db"
//! page_size = 1000
//! resolve_chunk_size = 500
//! enqueue_reindex = true
//!
//! [validation]
//! max_name_len = 140
//! max_reference_len = 70
//! max_price = "300.00"
//! ```
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]
//! - Apply the `DATABASE_URL` environment override: [`SyncConfig::with_env_overrides`]

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::price::Price;

/// Environment variable overriding [`SyncConfig::database_url`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML is malformed or has unknown keys.
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is syntactically valid but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for a synchronization process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// SQLite database path.
    pub database_url: String,
    /// Number of stocks requested per provider feed page.
    pub page_size: u32,
    /// Maximum number of references bound in one `IN (...)` query.
    pub resolve_chunk_size: usize,
    /// Push changed offers to the durable reindex queue instead of only logging them.
    pub enqueue_reindex: bool,
    /// Entity validation limits.
    pub validation: ValidationRules,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: "stock_sync.db".to_string(),
            page_size: 1000,
            resolve_chunk_size: 500,
            enqueue_reindex: true,
            validation: ValidationRules::default(),
        }
    }
}

impl SyncConfig {
    /// Replaces `database_url` with `$DATABASE_URL` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database_url = url;
            }
        }
        self
    }

    fn check(self) -> Result<Self, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be > 0".into()));
        }
        // SQLite caps bound parameters at 32766 since 3.32.
        if self.resolve_chunk_size == 0 || self.resolve_chunk_size > 32_000 {
            return Err(ConfigError::Invalid(
                "resolve_chunk_size must be within 1..=32000".into(),
            ));
        }
        if self.validation.max_name_len == 0 || self.validation.max_reference_len == 0 {
            return Err(ConfigError::Invalid("validation lengths must be > 0".into()));
        }
        Ok(self)
    }
}

/// Limits enforced on offers and stocks before they are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationRules {
    /// Maximum offer name length, in characters.
    pub max_name_len: usize,
    /// Maximum provider reference length, in characters.
    pub max_reference_len: usize,
    /// Highest accepted stock price.
    #[serde(with = "price_str")]
    pub max_price: Price,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_name_len: 140,
            max_reference_len: 70,
            max_price: Price::from_cents(30_000).unwrap_or(Price::ZERO),
        }
    }
}

mod price_str {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use crate::price::Price;

    pub fn serialize<S: Serializer>(price: &Price, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(price)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Price, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Price>().map_err(D::Error::custom)
    }
}

/// Parse a configuration from a TOML string.
pub fn load_config_str(s: &str) -> Result<SyncConfig, ConfigError> {
    let cfg: SyncConfig = toml::from_str(s)?;
    cfg.check()
}

/// Read and parse a configuration file.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<SyncConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.validation.max_price.to_string(), "300.00");
    }

    #[test]
    fn partial_file_overrides_given_keys() {
        let cfg = load_config_str(
            r#"
            page_size = 250
            enqueue_reindex = false

            [validation]
            max_price = "150.5"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.page_size, 250);
        assert!(!cfg.enqueue_reindex);
        assert_eq!(cfg.resolve_chunk_size, 500);
        assert_eq!(cfg.validation.max_price.cents(), 15_050);
        assert_eq!(cfg.validation.max_name_len, 140);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_str("page_sise = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_chunk_size_is_invalid() {
        let err = load_config_str("resolve_chunk_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn loads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, "database_url = \"/tmp/x.db\"\n").unwrap();

        let cfg = load_config_path(&path).unwrap();
        assert_eq!(cfg.database_url, "/tmp/x.db");

        let missing = load_config_path(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
