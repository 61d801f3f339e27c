//! Shared HTTP plumbing for the provider clients.

use std::sync::Arc;
use std::time::Duration;

use linkmeta_core::ProviderError;
use reqwest::{Response, Url};

use crate::ClientError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = "linkmeta/0.1";

/// Longest error body kept in a `ProviderError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Settings shared by every provider client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

impl HttpSettings {
    pub fn from_app(config: &linkmeta_core::AppConfig) -> Self {
        Self { timeout: config.timeout(), user_agent: config.user_agent.clone() }
    }
}

/// Build a `reqwest` client with the shared timeout and user agent.
pub fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .user_agent(&settings.user_agent)
        .build()
        .map_err(|e| ClientError::Build(Arc::new(e)))
}

/// Parse a configured endpoint.
pub fn parse_endpoint(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidEndpoint { url: raw.to_string(), reason: e.to_string() })?;
    if !url.has_host() {
        return Err(ClientError::InvalidEndpoint { url: raw.to_string(), reason: "missing host".to_string() });
    }
    Ok(url)
}

/// Map a `reqwest` failure onto the provider error taxonomy.
pub fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() { ProviderError::Timeout } else { ProviderError::Transport(err.to_string()) }
}

/// Read a response body, turning non-success statuses into errors.
pub async fn read_body(response: Response) -> Result<Vec<u8>, ProviderError> {
    let status = response.status();
    tracing::debug!(status = %status, url = %response.url(), "provider response");

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
        return Err(ProviderError::Status { status: status.as_u16(), body });
    }

    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(bytes.to_vec())
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("https://api.example.com/1/extract").is_ok());
        assert!(matches!(parse_endpoint("not a url"), Err(ClientError::InvalidEndpoint { .. })));
        assert!(matches!(parse_endpoint("data:text/plain,hi"), Err(ClientError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_truncate_keeps_char_boundary() {
        let mut s = "é".repeat(400);
        truncate_at_char_boundary(&mut s, MAX_ERROR_BODY);
        assert!(s.len() <= MAX_ERROR_BODY);
        assert!(s.chars().all(|c| c == 'é'));

        let mut short = "short".to_string();
        truncate_at_char_boundary(&mut short, MAX_ERROR_BODY);
        assert_eq!(short, "short");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(&HttpSettings::default()).is_ok());
    }
}
