//! Configuration loading for bragid.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.bragi/config.toml` (user)
//! 3. `/etc/bragi/config.toml` (system)
//!
//! With no file at all, built-in defaults are used: an in-memory cache in
//! front of the public Anthropic API, listening on `127.0.0.1:3000`.
//!
//! Remote cache credentials are read from `[cache.remote]`, falling back to
//! `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::admin::{AdminConfig, DEFAULT_EXPORT_LIMIT, DEFAULT_SAMPLE_SIZE};
use crate::backend::anthropic::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::cache::RemoteCredentials;
use crate::cache::memory::DEFAULT_MAX_ENTRIES;
use crate::gateway::{CacheBackendKind, DEFAULT_TTL};
use crate::{BragiError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3000).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Cache store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// "auto", "memory" or "remote" (default: auto).
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Entry bound for the in-memory store (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry lifetime in seconds; 0 disables expiry (default: 604800).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum entries per export (default: 1,000).
    #[serde(default = "default_export_limit")]
    pub export_limit: usize,
    /// Entries shown by the stats endpoint (default: 5).
    #[serde(default = "default_stats_sample")]
    pub stats_sample: usize,
    /// Per-command timeout for the remote store (default: 5).
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            export_limit: default_export_limit(),
            stats_sample: default_stats_sample(),
            remote_timeout_secs: default_remote_timeout(),
            remote: None,
        }
    }
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_export_limit() -> usize {
    DEFAULT_EXPORT_LIMIT
}

fn default_stats_sample() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_remote_timeout() -> u64 {
    5
}

/// Remote store endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Translation backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Anthropic API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_backend_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.bragi/config.toml`
    /// 3. `/etc/bragi/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a specific config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BragiError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            BragiError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(BragiError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".bragi").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/bragi/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl CacheConfig {
    /// Entry TTL; `None` when `ttl_secs` is 0.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    /// Remote credentials from the config file, falling back to the environment.
    ///
    /// File values win field by field, so a token may live in the
    /// environment while the URL sits in the file.
    pub fn remote_credentials(&self) -> Option<RemoteCredentials> {
        let remote = self.remote.clone().unwrap_or_default();
        let url = remote
            .url
            .or_else(|| std::env::var(crate::cache::remote::URL_ENV_VAR).ok());
        let token = remote
            .token
            .or_else(|| std::env::var(crate::cache::remote::TOKEN_ENV_VAR).ok());
        RemoteCredentials::new(url?, token?)
    }

    /// Limits for the admin surface.
    pub fn admin_config(&self) -> AdminConfig {
        AdminConfig::new()
            .export_limit(self.export_limit)
            .sample_size(self.stats_sample)
            .import_ttl(self.ttl())
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
