//! Test doubles shared by the server tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use linkmeta_core::provider::index_by_original_url;
use linkmeta_core::{
    AppConfig, CacheDb, NoopMetrics, ProviderError, ProviderKind, RawRecommendation, RecommendationSource,
    RemoteProvider,
};
use serde_json::Value;

use crate::state::AppState;

/// Serves a fixed list of records for any batch.
pub struct StubProvider {
    kind: ProviderKind,
    records: Vec<Value>,
}

impl StubProvider {
    pub fn new(kind: ProviderKind, records: Vec<Value>) -> Self {
        Self { kind, records }
    }
}

#[async_trait]
impl RemoteProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_batch(&self, _urls: &[String]) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(&self.records).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    fn parse(&self, requested: &[String], raw: &[u8]) -> Result<HashMap<String, Value>, ProviderError> {
        let records: Vec<Value> = serde_json::from_slice(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(index_by_original_url(requested, records.iter()))
    }
}

pub struct StubSource(pub Vec<RawRecommendation>);

#[async_trait]
impl RecommendationSource for StubSource {
    async fn fetch_recommendations(&self) -> Result<Vec<RawRecommendation>, ProviderError> {
        Ok(self.0.clone())
    }
}

pub fn config() -> AppConfig {
    AppConfig { domain_rate_limit: 100, ..Default::default() }
}

/// In-memory state with a single provider attached.
pub async fn state_with(provider: StubProvider) -> AppState {
    let config = config();
    let db = CacheDb::open_in_memory().await.unwrap();
    AppState::empty(&config, db, Arc::new(NoopMetrics)).with_provider(&config, Arc::new(provider))
}
