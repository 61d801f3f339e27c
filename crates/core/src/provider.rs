//! Remote metadata providers and recommendation sources.
//!
//! Concrete HTTP implementations live in `linkmeta-client`; the coordinator
//! only sees these traits.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider variants selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Query-string GET, flat list response.
    Embedly,
    /// JSON-body POST, nested map response.
    Mozilla,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Embedly => "embedly",
            ProviderKind::Mozilla => "mozilla",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a remote provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("error status returned: {status} {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("unable to parse response: {0}")]
    Parse(String),
}

/// A metadata provider answering for batches of URLs.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Perform the remote call for a batch and return the raw body.
    async fn fetch_batch(&self, urls: &[String]) -> Result<Vec<u8>, ProviderError>;

    /// Decode a raw body into records keyed by their requested URL.
    ///
    /// Records for URLs that were not requested are dropped.
    fn parse(&self, requested: &[String], raw: &[u8]) -> Result<HashMap<String, Value>, ProviderError>;
}

/// One recommended item as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecommendation {
    pub url: String,
    /// Publication time in unix seconds, if the source knows it.
    pub published_at: Option<i64>,
}

/// Source of the periodically refreshed recommendation list.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn fetch_recommendations(&self) -> Result<Vec<RawRecommendation>, ProviderError>;
}

/// Key records by their `original_url`, keeping only requested URLs.
///
/// Records without a string `original_url` are skipped. Shared by the
/// provider implementations, which differ only in how they reach the list.
pub fn index_by_original_url<'a, I>(requested: &[String], records: I) -> HashMap<String, Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();

    records
        .into_iter()
        .filter_map(|record| {
            let original = record.get("original_url")?.as_str()?;
            requested
                .contains(original)
                .then(|| (original.to_string(), record.clone()))
        })
        .collect()
}
