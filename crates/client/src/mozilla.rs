//! Mozilla page-metadata service provider.
//!
//! - **Endpoint**: `POST {base_url}` with body `{"urls": [...]}`
//! - **Response**: `{"urls": {<key>: record}}`; keys are not trusted, each
//!   record is matched by its own `original_url`.

use std::collections::HashMap;

use async_trait::async_trait;
use linkmeta_core::provider::index_by_original_url;
use linkmeta_core::{AppConfig, ProviderError, ProviderKind, RemoteProvider};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClientError;
use crate::http::{HttpSettings, build_client, parse_endpoint, read_body, transport_error};

/// Default page-metadata endpoint.
pub const DEFAULT_MOZILLA_URL: &str = "https://page-metadata.services.mozilla.com/v1/metadata";

#[derive(Debug, Clone)]
pub struct MozillaConfig {
    pub base_url: String,
    pub http: HttpSettings,
}

impl Default for MozillaConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_MOZILLA_URL.to_string(), http: HttpSettings::default() }
    }
}

impl MozillaConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { base_url: config.mozilla_url.clone(), http: HttpSettings::from_app(config) }
    }
}

#[derive(Serialize)]
struct MetadataRequest<'a> {
    urls: &'a [String],
}

#[derive(Deserialize)]
struct MetadataResponse {
    urls: HashMap<String, Value>,
}

/// Body-based metadata provider.
#[derive(Debug, Clone)]
pub struct MozillaProvider {
    http: reqwest::Client,
    endpoint: Url,
}

impl MozillaProvider {
    pub fn new(config: MozillaConfig) -> Result<Self, ClientError> {
        Ok(Self { http: build_client(&config.http)?, endpoint: parse_endpoint(&config.base_url)? })
    }
}

#[async_trait]
impl RemoteProvider for MozillaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mozilla
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<Vec<u8>, ProviderError> {
        tracing::debug!(urls = urls.len(), "requesting page metadata batch");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&MetadataRequest { urls })
            .send()
            .await
            .map_err(transport_error)?;

        read_body(response).await
    }

    fn parse(&self, requested: &[String], raw: &[u8]) -> Result<HashMap<String, Value>, ProviderError> {
        let body: MetadataResponse = serde_json::from_slice(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(index_by_original_url(requested, body.urls.values()))
    }
}
