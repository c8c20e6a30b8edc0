//! Configuration loading and config-file resolution
//!
//! Resolution priority for the config file path:
//! 1. Command-line argument (highest priority)
//! 2. `CHARTSYNC_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/chartsync/config.toml`)
//!
//! A missing config file is not an error; compiled defaults are used. The
//! defaults mirror the catalog provider's real constraints (bulk lookup
//! maxima of 50 tracks, 20 albums, 50 artists per request).

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file path
pub const CONFIG_ENV_VAR: &str = "CHARTSYNC_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Curated ranked-list input file (JSON array)
    pub input_path: PathBuf,
    /// Directory receiving the exported JSON/CSV/SQL files
    pub output_dir: PathBuf,
    /// Schema name used by the SQL insert writer
    pub sql_schema: String,
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub batch: BatchConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/chart_master_data.json"),
            output_dir: PathBuf::from("out"),
            sql_schema: "chartsync".to_string(),
            auth: AuthConfig::default(),
            catalog: CatalogConfig::default(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Credential store location and account selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON credential store holding per-account token entries
    pub store_path: PathBuf,
    /// Account key inside the credential store
    pub account: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("credentials.json"),
            account: "spotify".to_string(),
        }
    }
}

/// Catalog API endpoints and request shaping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Market restriction passed on search and bulk lookups
    pub market: String,
    /// Number of candidates requested per search call
    pub search_limit: u32,
    /// Minimum interval between catalog requests
    pub rate_limit_ms: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            market: "GB".to_string(),
            search_limit: 3,
            rate_limit_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Kind-specific bulk lookup maxima
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub tracks: usize,
    pub albums: usize,
    pub artists: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tracks: 50,
            albums: 20,
            artists: 50,
        }
    }
}

/// Retry budget for transient network failures during hydration
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub transient_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            transient_attempts: 2,
        }
    }
}

impl Config {
    /// Load configuration, resolving the file path per the module docs.
    pub fn load(cli_arg: Option<&Path>) -> Result<Config> {
        let path = resolve_config_path(cli_arg);

        let Some(path) = path else {
            info!("No config file found, using compiled defaults");
            return Ok(Config::default());
        };

        if !path.exists() {
            if cli_arg.is_some() || std::env::var(CONFIG_ENV_VAR).is_ok() {
                // An explicitly named file that does not exist is an error;
                // a missing default-location file is not.
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("No config file found, using compiled defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Validate values the rest of the pipeline assumes are sane
    pub fn validate(&self) -> Result<()> {
        if self.batch.tracks == 0 || self.batch.albums == 0 || self.batch.artists == 0 {
            return Err(Error::Config(
                "Batch sizes must be at least 1".to_string(),
            ));
        }
        if self.catalog.search_limit == 0 {
            return Err(Error::Config(
                "catalog.search_limit must be at least 1".to_string(),
            ));
        }
        if self.auth.account.trim().is_empty() {
            return Err(Error::Config("auth.account must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Resolve the config file path following CLI > ENV > platform default
fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let default = dirs::config_dir().map(|d| d.join("chartsync").join("config.toml"));
    if let Some(path) = &default {
        debug!(path = %path.display(), "Using platform default config location");
    }
    default.filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_provider_constraints() {
        let config = Config::default();
        assert_eq!(config.batch.tracks, 50);
        assert_eq!(config.batch.albums, 20);
        assert_eq!(config.batch.artists, 50);
        assert_eq!(config.catalog.search_limit, 3);
        assert_eq!(config.catalog.market, "GB");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_str = r#"
            sql_schema = "rstop500"

            [batch]
            albums = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sql_schema, "rstop500");
        assert_eq!(config.batch.albums, 10);
        assert_eq!(config.batch.tracks, 50);
        assert_eq!(config.catalog.market, "GB");
    }

    #[test]
    fn zero_batch_size_rejected() {
        let toml_str = r#"
            [batch]
            tracks = 0
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = Config::load(Some(&missing));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sql_schema = \"custom\"").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sql_schema, "custom");
    }
}
