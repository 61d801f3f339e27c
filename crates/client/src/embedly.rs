//! Embedly extract API provider.
//!
//! - **Endpoint**: `GET {base_url}?key={key}&urls={u1},{u2},...`
//! - Each URL is form-encoded on its own, then joined with literal commas.
//! - **Response**: a JSON list of records, each carrying its `original_url`.

use std::collections::HashMap;

use async_trait::async_trait;
use linkmeta_core::provider::index_by_original_url;
use linkmeta_core::{AppConfig, ProviderError, ProviderKind, RemoteProvider};
use reqwest::Url;
use serde_json::Value;
use url::form_urlencoded::byte_serialize;

use crate::ClientError;
use crate::http::{HttpSettings, build_client, parse_endpoint, read_body, transport_error};

/// Default Embedly extract endpoint.
pub const DEFAULT_EMBEDLY_URL: &str = "https://api.embedly.com/1/extract";

#[derive(Debug, Clone)]
pub struct EmbedlyConfig {
    pub base_url: String,
    pub api_key: String,
    pub http: HttpSettings,
}

impl Default for EmbedlyConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_EMBEDLY_URL.to_string(), api_key: String::new(), http: HttpSettings::default() }
    }
}

impl EmbedlyConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.embedly_url.clone(),
            api_key: config.embedly_key.clone().unwrap_or_default(),
            http: HttpSettings::from_app(config),
        }
    }
}

/// Query-based metadata provider.
#[derive(Debug, Clone)]
pub struct EmbedlyProvider {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl EmbedlyProvider {
    pub fn new(config: EmbedlyConfig) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingApiKey("LINKMETA_EMBEDLY_KEY"));
        }

        Ok(Self {
            http: build_client(&config.http)?,
            endpoint: parse_endpoint(&config.base_url)?,
            api_key: config.api_key,
        })
    }

    /// Full request URL for a batch.
    pub fn request_url(&self, urls: &[String]) -> Url {
        let key: String = byte_serialize(self.api_key.as_bytes()).collect();
        let joined = urls
            .iter()
            .map(|u| byte_serialize(u.as_bytes()).collect::<String>())
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.endpoint.clone();
        url.set_query(Some(&format!("key={key}&urls={joined}")));
        url
    }
}

#[async_trait]
impl RemoteProvider for EmbedlyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Embedly
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<Vec<u8>, ProviderError> {
        tracing::debug!(urls = urls.len(), "requesting embedly batch");

        let response = self
            .http
            .get(self.request_url(urls))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        read_body(response).await
    }

    fn parse(&self, requested: &[String], raw: &[u8]) -> Result<HashMap<String, Value>, ProviderError> {
        let records: Vec<Value> = serde_json::from_slice(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(index_by_original_url(requested, records.iter()))
    }
}
