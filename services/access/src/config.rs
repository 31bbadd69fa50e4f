//! Client configuration
//!
//! Values come from built-in defaults, then an optional `access-client.toml`
//! in the working directory, then `ACCESS_*` environment variables
//! (for example `ACCESS_API_BASE_URL`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use auth::http::TransportConfig;
use common::cache::CacheConfig;
use config::{Config, Environment, File};
use nfc::NfcConfig;
use serde::Deserialize;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Backend base URL
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// JSON file holding the token, caches and settings; in memory when unset
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    pub history_page_size: u32,
    pub cards_page_size: u32,
    pub history_cache_ttl_secs: u64,
    pub cards_cache_ttl_secs: u64,
    pub nfc_scan_timeout_secs: u64,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl AppConfig {
    /// Load from the default file name and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("access-client")
    }

    /// Load with an explicit config file stem; a missing file is not an error
    pub fn load_from(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .set_default("api_base_url", "http://localhost:3001")?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("history_page_size", 20_i64)?
            .set_default("cards_page_size", 20_i64)?
            .set_default("history_cache_ttl_secs", 300_i64)?
            .set_default("cards_cache_ttl_secs", 120_i64)?
            .set_default("nfc_scan_timeout_secs", 30_i64)?
            .set_default("log_level", "info")?
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix("ACCESS").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.history_page_size == 0 || config.cards_page_size == 0 {
            anyhow::bail!("Page sizes must be greater than zero");
        }
        Ok(config)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.api_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            history_ttl: Duration::from_secs(self.history_cache_ttl_secs),
            cards_ttl: Duration::from_secs(self.cards_cache_ttl_secs),
            ..CacheConfig::default()
        }
    }

    pub fn nfc(&self) -> NfcConfig {
        NfcConfig {
            scan_timeout: Duration::from_secs(self.nfc_scan_timeout_secs),
            ..NfcConfig::default()
        }
    }
}
