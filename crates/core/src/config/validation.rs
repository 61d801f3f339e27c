//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - any TTL, the batch size, the request size or the rate limit is 0
    /// - `data_ttl_secs` is shorter than `pending_ttl_secs`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        for (field, value) in [
            ("data_ttl_secs", self.data_ttl_secs),
            ("pending_ttl_secs", self.pending_ttl_secs),
            ("job_ttl_secs", self.job_ttl_secs),
            ("recommendations_ttl_secs", self.recommendations_ttl_secs),
            ("domain_rate_limit", self.domain_rate_limit),
            ("domain_rate_period_secs", self.domain_rate_period_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        // Clients poll for populated data; it must outlive the in-flight marker.
        if self.data_ttl_secs < self.pending_ttl_secs {
            return Err(invalid("data_ttl_secs", "must not be shorter than pending_ttl_secs"));
        }

        if self.url_batch_size == 0 {
            return Err(invalid("url_batch_size", "must be greater than 0"));
        }
        if self.max_request_urls == 0 {
            return Err(invalid("max_request_urls", "must be greater than 0"));
        }

        if self.blocked_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(invalid("blocked_domains", "must not contain empty entries"));
        }

        if self.pending_ttl_secs < self.job_ttl_secs {
            tracing::warn!(
                pending_ttl_secs = self.pending_ttl_secs,
                job_ttl_secs = self.job_ttl_secs,
                "pending marker expires before queued jobs do; duplicate fetch jobs become more likely"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let config = AppConfig { url_batch_size: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("url_batch_size"));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let config = AppConfig { domain_rate_limit: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("domain_rate_limit"));
    }

    #[test]
    fn test_validate_data_ttl_shorter_than_pending() {
        let config = AppConfig { data_ttl_secs: 60, pending_ttl_secs: 120, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("data_ttl_secs"));
    }

    #[test]
    fn test_validate_empty_blocked_domain() {
        let config = AppConfig { blocked_domains: vec!["embedly.com".into(), " ".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("blocked_domains"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            timeout_ms: 100,
            data_ttl_secs: 1,
            pending_ttl_secs: 1,
            job_ttl_secs: 1,
            url_batch_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
