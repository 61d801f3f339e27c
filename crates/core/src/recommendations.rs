//! Cached recommendation list with background refresh.
//!
//! A single key holds the whole list. Readers never block on the remote
//! source: a miss marks the key pending and queues a refresh job.

use std::sync::Arc;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::entry::{CacheEntry, encode_pending, encode_populated};
use crate::metrics::MetricsSink;
use crate::provider::{ProviderError, RawRecommendation, RecommendationSource};
use crate::queue::{JobPriority, JobQueue, Task};
use crate::store::KeyValueCache;

pub const DEFAULT_RECOMMENDATIONS_KEY: &str = "recommendations:pocket";

#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub key: String,
    /// TTL of the cached list.
    pub data_ttl: Duration,
    /// TTL of the pending marker and of the refresh job.
    pub job_ttl: Duration,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_RECOMMENDATIONS_KEY.to_string(),
            data_ttl: Duration::from_secs(600),
            job_ttl: Duration::from_secs(300),
        }
    }
}

/// One recommended URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub url: String,
    /// Publication time in unix milliseconds.
    pub timestamp: i64,
}

impl Recommendation {
    /// Convert a source item, using `now_ms` when the source has no usable time.
    fn from_raw(raw: RawRecommendation, now_ms: i64) -> Self {
        let timestamp = match raw.published_at {
            Some(secs) if secs > 0 => secs.saturating_mul(1000),
            _ => now_ms,
        };
        Self { url: raw.url, timestamp }
    }
}

pub struct RecommendationCache {
    settings: RecommendationSettings,
    cache: Arc<dyn KeyValueCache>,
    queue: Arc<dyn JobQueue>,
    source: Arc<dyn RecommendationSource>,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for RecommendationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationCache").field("settings", &self.settings).finish()
    }
}

impl RecommendationCache {
    pub fn new(
        settings: RecommendationSettings, cache: Arc<dyn KeyValueCache>, queue: Arc<dyn JobQueue>,
        source: Arc<dyn RecommendationSource>, metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { settings, cache, queue, source, metrics }
    }

    /// Return the cached list, or an empty list while a refresh is in flight.
    ///
    /// On a miss the key is marked pending and a refresh job queued. A
    /// failed enqueue is counted and still yields an empty list; the marker
    /// expires with the job TTL and the next call retries.
    ///
    /// # Errors
    ///
    /// Returns store errors and `Error::CacheDecode` for a malformed list.
    pub async fn get_or_schedule(&self) -> Result<Vec<Recommendation>, Error> {
        let key = &self.settings.key;
        let raw = self.cache.get(key).await?;

        match CacheEntry::<Vec<Recommendation>>::decode(key, raw.as_deref())? {
            CacheEntry::Populated(list) => {
                self.metrics.incr("cache_hit");
                Ok(list)
            }
            CacheEntry::Pending => {
                self.metrics.incr("cache_hit");
                self.metrics.incr("request_in_job_queue");
                Ok(Vec::new())
            }
            CacheEntry::Absent => {
                self.metrics.incr("cache_miss");
                self.cache.set_with_ttl(key, &encode_pending(), self.settings.job_ttl).await?;
                self.metrics.incr("cache_write");

                match self
                    .queue
                    .enqueue(Task::RefreshRecommendations, self.settings.job_ttl, JobPriority::High)
                    .await
                {
                    Ok(handle) => {
                        tracing::debug!(job = handle.id, "recommendation refresh queued");
                        self.metrics.incr("request_recommended_job_create");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to queue recommendation refresh");
                        self.metrics.incr("request_recommended_job_create_fail");
                    }
                }
                Ok(Vec::new())
            }
        }
    }

    /// Fetch the list from the source and overwrite the cached copy.
    ///
    /// # Errors
    ///
    /// Source failures leave the key untouched and are returned as
    /// `Error::Provider`.
    pub async fn refresh(&self) -> Result<Vec<Recommendation>, Error> {
        let start = Instant::now();
        let fetched = self.source.fetch_recommendations().await;
        self.metrics.timing("pocket_request_timer", start.elapsed());

        let items = fetched.inspect_err(|e| {
            tracing::warn!(error = %e, "recommendation source failed");
            match e {
                ProviderError::Parse(_) => self.metrics.incr("pocket_parse_failure"),
                _ => self.metrics.incr("pocket_request_failure"),
            }
        })?;
        self.metrics.incr("pocket_request_success");

        let now_ms = chrono::Utc::now().timestamp_millis();
        let list: Vec<Recommendation> = items.into_iter().map(|raw| Recommendation::from_raw(raw, now_ms)).collect();

        let key = &self.settings.key;
        let bytes = encode_populated(key, &list)?;
        self.cache.set_with_ttl(key, &bytes, self.settings.data_ttl).await?;
        self.metrics.incr("cache_write");

        tracing::info!(count = list.len(), "refreshed recommendations");
        Ok(list)
    }
}
