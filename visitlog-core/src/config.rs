//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/visitlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/visitlog/` (~/.config/visitlog/)
//! - Data: `$XDG_DATA_HOME/visitlog/` (~/.local/share/visitlog/)
//! - State/Logs: `$XDG_STATE_HOME/visitlog/` (~/.local/state/visitlog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default ingest endpoint for the token-based remote strategy
pub const DEFAULT_LOGTAIL_ENDPOINT: &str = "https://in.logtail.com";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Delivery strategy selection
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reporter configuration
///
/// The token and the URL are mutually exclusive strategy selectors; the token
/// wins when both are set. Empty strings count as unset.
#[derive(Debug, Deserialize, Clone)]
pub struct ReporterConfig {
    /// Logtail source token (enables the remote strategy)
    #[serde(default)]
    pub logtail_source_token: Option<String>,

    /// Custom collection endpoint (enables the custom-endpoint strategy)
    #[serde(default)]
    pub custom_api_url: Option<String>,

    /// Reserved for a Gist-based strategy that does not exist
    #[serde(default)]
    pub use_github_gist: bool,

    /// Where the remote strategy posts to
    #[serde(default = "default_logtail_endpoint")]
    pub logtail_endpoint: String,

    /// HTTP request timeout in seconds (unset: no client-side timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            logtail_source_token: None,
            custom_api_url: None,
            use_github_gist: false,
            logtail_endpoint: default_logtail_endpoint(),
            timeout_secs: None,
        }
    }
}

fn default_logtail_endpoint() -> String {
    DEFAULT_LOGTAIL_ENDPOINT.to_string()
}

impl ReporterConfig {
    /// The configured token, if non-empty
    pub fn token(&self) -> Option<&str> {
        non_empty(self.logtail_source_token.as_deref())
    }

    /// The configured custom endpoint, if non-empty
    pub fn custom_url(&self) -> Option<&str> {
        non_empty(self.custom_api_url.as_deref())
    }

    /// True when either network strategy is configured
    pub fn has_remote(&self) -> bool {
        self.token().is_some() || self.custom_url().is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        check_http_url("reporter.logtail_endpoint", &self.logtail_endpoint)?;
        if let Some(url) = self.custom_url() {
            check_http_url("reporter.custom_api_url", url)?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn check_http_url(field: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        if config.reporter.use_github_gist {
            tracing::warn!("reporter.use_github_gist is set but no Gist strategy exists; ignoring");
        }

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/visitlog/config.toml` (~/.config/visitlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("visitlog").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("visitlog")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("visitlog")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/visitlog/visits.db` (~/.local/share/visitlog/visits.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("visits.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("visitlog.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
