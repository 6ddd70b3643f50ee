//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache store.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache version identifying the generation this build installs.
    ///
    /// Opaque string; bump it to roll a new generation. Set via
    /// OFFCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the hosting application, used to resolve bare manifest
    /// paths and the fallback document.
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Ordered list of resources that must all be cached during install.
    ///
    /// Entries are paths or absolute cross-origin URLs.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Path suffixes that make an uncached request cache-eligible once
    /// fetched. Evaluated in order, first match wins.
    #[serde(default = "default_dynamic_suffixes")]
    pub dynamic_suffixes: Vec<String>,

    /// Origins that must always hit the network, never the cache
    /// (e.g. the backing API/auth host).
    ///
    /// Set via OFFCACHE_BYPASS_ORIGINS environment variable.
    #[serde(default)]
    pub bypass_origins: Vec<String>,

    /// Document served when a navigation request cannot be satisfied by
    /// network or exact cache match.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Activate a freshly installed generation immediately instead of
    /// waiting for existing clients to close.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Background-sync tag recognized by the notification bridge.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// URL the data-sync routine runs against.
    #[serde(default = "default_sync_url")]
    pub sync_url: String,

    /// Default title for push notifications with no title in the payload.
    #[serde(default = "default_push_title")]
    pub push_title: String,

    /// Default body for push notifications with no body in the payload.
    #[serde(default = "default_push_body")]
    pub push_body: String,

    /// User-Agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache_manifest() -> Vec<String> {
    vec!["/index.html".into()]
}

fn default_dynamic_suffixes() -> Vec<String> {
    vec![".js".into(), ".css".into(), ".png".into(), ".svg".into(), ".woff2".into()]
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_sync_tag() -> String {
    "sync-data".into()
}

fn default_sync_url() -> String {
    "/api/sync".into()
}

fn default_push_title() -> String {
    "New notification".into()
}

fn default_push_body() -> String {
    "You have new content available.".into()
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            precache_manifest: default_precache_manifest(),
            dynamic_suffixes: default_dynamic_suffixes(),
            bypass_origins: Vec::new(),
            fallback_document: default_fallback_document(),
            skip_waiting: true,
            sync_tag: default_sync_tag(),
            sync_url: default_sync_url(),
            push_title: default_push_title(),
            push_body: default_push_body(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// App origin parsed as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not a valid
    /// http(s) URL. `validate()` checks the same thing up front, so this
    /// only fails on hand-built configs.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        validation::parse_origin(&self.origin)
    }
}
