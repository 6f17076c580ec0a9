//! Application configuration loading.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_AGGREGATE_PAGE_SIZE: u32 = 2000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, merged from defaults, the config file, and environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the library API server.
    pub api_base_url: String,
    /// Records per page for the browsing view.
    pub page_size: u32,
    /// Records per page for the one-shot aggregate fetch.
    pub aggregate_page_size: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration, layering `steamlib.toml` and `STEAMLIB_*`
    /// environment variables over built-in defaults.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("page_size", DEFAULT_PAGE_SIZE)?
            .set_default("aggregate_page_size", DEFAULT_AGGREGATE_PAGE_SIZE)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        if let Some(path) = config_file_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("STEAMLIB").try_parsing(true))
            .build()
            .context("building configuration")?;

        settings
            .try_deserialize()
            .context("deserialising configuration")
    }
}

/// Path to the user config file, when a config directory exists.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("steamlib").join("steamlib.toml"))
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    let Some(path) = config_file_path() else {
        return Ok(());
    };
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let contents = format!(
        "# steamlib configuration\n\
         api_base_url = \"{DEFAULT_API_BASE_URL}\"\n\
         page_size = {DEFAULT_PAGE_SIZE}\n\
         aggregate_page_size = {DEFAULT_AGGREGATE_PAGE_SIZE}\n\
         request_timeout_secs = {DEFAULT_REQUEST_TIMEOUT_SECS}\n"
    );
    std::fs::write(&path, contents)
        .with_context(|| format!("writing default config {}", path.display()))
}
