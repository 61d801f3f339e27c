//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LINKMETA_*)
//! 2. TOML config file (if LINKMETA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorSettings;
use crate::provider::ProviderKind;
use crate::recommendations::RecommendationSettings;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LINKMETA_*)
/// 2. TOML config file (if LINKMETA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store shared by every linkmeta process.
    ///
    /// Set via LINKMETA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for provider requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Provider request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Embedly extract endpoint.
    #[serde(default = "default_embedly_url")]
    pub embedly_url: String,

    /// Embedly API key. The Embedly tool is disabled without it.
    ///
    /// Set via LINKMETA_EMBEDLY_KEY environment variable.
    #[serde(default)]
    pub embedly_key: Option<String>,

    /// Mozilla page-metadata endpoint.
    #[serde(default = "default_mozilla_url")]
    pub mozilla_url: String,

    /// Pocket global recommendations endpoint.
    #[serde(default = "default_pocket_url")]
    pub pocket_url: String,

    /// Pocket consumer key. Recommendations are disabled without it.
    ///
    /// Set via LINKMETA_POCKET_KEY environment variable.
    #[serde(default)]
    pub pocket_key: Option<String>,

    /// Registrable domains whose images are stripped from records.
    ///
    /// Set via LINKMETA_BLOCKED_DOMAINS as a list, e.g. `[embedly.com,example.net]`.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Lifetime of validated metadata in the cache.
    #[serde(default = "default_data_ttl_secs")]
    pub data_ttl_secs: u64,

    /// Lifetime of the in-flight marker written when a fetch job is dispatched.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,

    /// How long a queued job may wait before the queue discards it.
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,

    /// Lifetime of the cached recommendation list.
    #[serde(default = "default_recommendations_ttl_secs")]
    pub recommendations_ttl_secs: u64,

    /// Maximum number of URLs sent to a provider in one fetch job.
    #[serde(default = "default_url_batch_size")]
    pub url_batch_size: usize,

    /// Maximum number of URLs accepted in a single request.
    #[serde(default = "default_max_request_urls")]
    pub max_request_urls: usize,

    /// Fetches admitted per registrable domain per window.
    #[serde(default = "default_domain_rate_limit")]
    pub domain_rate_limit: u64,

    /// Length of the domain rate-limit window in seconds.
    #[serde(default = "default_domain_rate_period_secs")]
    pub domain_rate_period_secs: u64,

    /// Whether this process also drains the fetch-job queue.
    #[serde(default = "default_true")]
    pub worker_enabled: bool,

    /// Worker sleep between polls of an empty queue, in milliseconds.
    #[serde(default = "default_worker_poll_ms")]
    pub worker_poll_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./linkmeta-cache.sqlite")
}

fn default_user_agent() -> String {
    "linkmeta/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_embedly_url() -> String {
    "https://api.embedly.com/1/extract".into()
}

fn default_mozilla_url() -> String {
    "https://page-metadata.services.mozilla.com/v1/metadata".into()
}

fn default_pocket_url() -> String {
    "https://getpocket.com/v3/firefox/global-recs".into()
}

fn default_blocked_domains() -> Vec<String> {
    vec!["embedly.com".into()]
}

fn default_data_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_pending_ttl_secs() -> u64 {
    60 * 60
}

fn default_job_ttl_secs() -> u64 {
    300
}

fn default_recommendations_ttl_secs() -> u64 {
    10 * 60
}

fn default_url_batch_size() -> usize {
    5
}

fn default_max_request_urls() -> usize {
    25
}

fn default_domain_rate_limit() -> u64 {
    10
}

fn default_domain_rate_period_secs() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_worker_poll_ms() -> u64 {
    250
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            embedly_url: default_embedly_url(),
            embedly_key: None,
            mozilla_url: default_mozilla_url(),
            pocket_url: default_pocket_url(),
            pocket_key: None,
            blocked_domains: default_blocked_domains(),
            data_ttl_secs: default_data_ttl_secs(),
            pending_ttl_secs: default_pending_ttl_secs(),
            job_ttl_secs: default_job_ttl_secs(),
            recommendations_ttl_secs: default_recommendations_ttl_secs(),
            url_batch_size: default_url_batch_size(),
            max_request_urls: default_max_request_urls(),
            domain_rate_limit: default_domain_rate_limit(),
            domain_rate_period_secs: default_domain_rate_period_secs(),
            worker_enabled: true,
            worker_poll_ms: default_worker_poll_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_ms)
    }

    pub fn domain_rate_period(&self) -> Duration {
        Duration::from_secs(self.domain_rate_period_secs)
    }

    /// Coordinator settings for one provider, keyed under the provider's name.
    pub fn coordinator_settings(&self, kind: ProviderKind) -> CoordinatorSettings {
        CoordinatorSettings {
            key_prefix: kind.as_str().to_string(),
            data_ttl: Duration::from_secs(self.data_ttl_secs),
            pending_ttl: Duration::from_secs(self.pending_ttl_secs),
            job_ttl: Duration::from_secs(self.job_ttl_secs),
            batch_size: self.url_batch_size,
            blocked_domains: self.blocked_domains.clone(),
        }
    }

    pub fn recommendation_settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            data_ttl: Duration::from_secs(self.recommendations_ttl_secs),
            job_ttl: Duration::from_secs(self.job_ttl_secs),
            ..Default::default()
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LINKMETA_`
    /// 2. TOML file from `LINKMETA_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("LINKMETA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LINKMETA_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Embedly key, required only when the Embedly provider is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_embedly_key(&self) -> Result<&str, ConfigError> {
        self.embedly_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "embedly_key".into(),
            hint: "Set LINKMETA_EMBEDLY_KEY environment variable".into(),
        })
    }

    /// Pocket consumer key, required only when recommendations are enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_pocket_key(&self) -> Result<&str, ConfigError> {
        self.pocket_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "pocket_key".into(),
            hint: "Set LINKMETA_POCKET_KEY environment variable".into(),
        })
    }
}
