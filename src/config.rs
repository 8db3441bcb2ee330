use serde::Deserialize;
use std::path::{Path, PathBuf};

/// An account and the domains it owns, registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSeed {
    pub api_key: String,
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// On-disk DuckDB file. Unset keeps everything in memory.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// The only origin CORS lets through. Unset disables cross-origin access.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
    /// Upper bound on per-request processing time (default: 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: 30).
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Key for the daily visitor-id salt. A random one is used when unset.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

/// Per-request processing bound, shared with [`crate::ingest::handler::AppState`].
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: None,
            dashboard_origin: None,
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            secret: None,
            accounts: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `SITEPULSE_HOST` → host
    /// - `SITEPULSE_PORT` → port
    /// - `SITEPULSE_DATABASE` → database
    /// - `SITEPULSE_DASHBOARD_ORIGIN` → dashboard_origin
    /// - `SITEPULSE_REQUEST_TIMEOUT` → request_timeout_secs
    /// - `SITEPULSE_SHUTDOWN_TIMEOUT` → shutdown_timeout_secs
    /// - `SITEPULSE_SECRET` → secret
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Apply `SITEPULSE_*` overrides read through `lookup`.
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("SITEPULSE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("SITEPULSE_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(path) = lookup("SITEPULSE_DATABASE") {
            self.database = Some(PathBuf::from(path));
        }
        if let Some(origin) = lookup("SITEPULSE_DASHBOARD_ORIGIN") {
            self.dashboard_origin = Some(origin);
        }
        if let Some(t) = lookup("SITEPULSE_REQUEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = t;
        }
        if let Some(t) = lookup("SITEPULSE_SHUTDOWN_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.shutdown_timeout_secs = t;
        }
        if let Some(secret) = lookup("SITEPULSE_SECRET").filter(|s| !s.is_empty()) {
            self.secret = Some(secret);
        }
    }
}
