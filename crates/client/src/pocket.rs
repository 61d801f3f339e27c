//! Pocket global recommendations source.
//!
//! `GET {base_url}?consumer_key={key}` returns
//! `{"list": [{"dedupe_url": ..., "published_timestamp": "..."}]}`.

use async_trait::async_trait;
use linkmeta_core::{AppConfig, ProviderError, RawRecommendation, RecommendationSource};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::ClientError;
use crate::http::{HttpSettings, build_client, parse_endpoint, read_body, transport_error};

/// Default recommendations endpoint.
pub const DEFAULT_POCKET_URL: &str = "https://getpocket.com/v3/firefox/global-recs";

#[derive(Debug, Clone)]
pub struct PocketConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub http: HttpSettings,
}

impl Default for PocketConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_POCKET_URL.to_string(), consumer_key: String::new(), http: HttpSettings::default() }
    }
}

impl PocketConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.pocket_url.clone(),
            consumer_key: config.pocket_key.clone().unwrap_or_default(),
            http: HttpSettings::from_app(config),
        }
    }
}

#[derive(Deserialize)]
struct PocketResponse {
    list: Vec<PocketItem>,
}

#[derive(Deserialize)]
struct PocketItem {
    dedupe_url: String,
    #[serde(default)]
    published_timestamp: Option<Value>,
}

impl PocketItem {
    /// Pocket reports seconds as a string; numbers are accepted too.
    /// A missing or null timestamp is `None`; anything else must be an integer.
    fn published_at(&self) -> Result<Option<i64>, ProviderError> {
        let invalid = |value: &Value| {
            ProviderError::Parse(format!("invalid published_timestamp {value} for {}", self.dedupe_url))
        };
        match &self.published_timestamp {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid(value)),
            Some(value @ Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(value)),
            Some(value) => Err(invalid(value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PocketSource {
    http: reqwest::Client,
    endpoint: Url,
}

impl PocketSource {
    pub fn new(config: PocketConfig) -> Result<Self, ClientError> {
        if config.consumer_key.is_empty() {
            return Err(ClientError::MissingApiKey("LINKMETA_POCKET_KEY"));
        }

        let mut endpoint = parse_endpoint(&config.base_url)?;
        endpoint.query_pairs_mut().append_pair("consumer_key", &config.consumer_key);

        Ok(Self { http: build_client(&config.http)?, endpoint })
    }

    fn parse(raw: &[u8]) -> Result<Vec<RawRecommendation>, ProviderError> {
        let body: PocketResponse = serde_json::from_slice(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;
        body.list
            .into_iter()
            .map(|item| Ok(RawRecommendation { published_at: item.published_at()?, url: item.dedupe_url }))
            .collect()
    }
}

#[async_trait]
impl RecommendationSource for PocketSource {
    async fn fetch_recommendations(&self) -> Result<Vec<RawRecommendation>, ProviderError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let raw = read_body(response).await?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base_url: String) -> PocketSource {
        PocketSource::new(PocketConfig { base_url, consumer_key: "pocket-key".into(), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(PocketSource::new(PocketConfig::default()), Err(ClientError::MissingApiKey(_))));
    }

    #[tokio::test]
    async fn test_fetch_recommendations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/firefox/global-recs"))
            .and(query_param("consumer_key", "pocket-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [
                    {"dedupe_url": "http://www.example.com/recommended/content/", "published_timestamp": "1500000000"},
                    {"dedupe_url": "http://www.example.com/recommended/other/", "published_timestamp": "0"},
                    {"dedupe_url": "http://www.example.com/recommended/undated/"},
                ]
            })))
            .mount(&server)
            .await;

        let items = source(format!("{}/v3/firefox/global-recs", server.uri()))
            .fetch_recommendations()
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].url, "http://www.example.com/recommended/content/");
        assert_eq!(items[0].published_at, Some(1_500_000_000));
        assert_eq!(items[1].published_at, Some(0));
        assert_eq!(items[2].published_at, None);
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{"dedupe_url": "http://www.example.com/a", "published_timestamp": "yesterday"}]
            })))
            .mount(&server)
            .await;

        let err = source(server.uri()).fetch_recommendations().await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(msg) if msg.contains("yesterday")));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = source(server.uri()).fetch_recommendations().await.unwrap_err();
        assert_eq!(err, ProviderError::Status { status: 403, body: "bad key".into() });
    }

    #[test]
    fn test_numeric_timestamp_accepted() {
        let items = PocketSource::parse(br#"{"list":[{"dedupe_url":"https://a.example/","published_timestamp":42}]}"#)
            .unwrap();
        assert_eq!(items[0].published_at, Some(42));
    }
}
