//! Cache-aside metadata population.
//!
//! [`MetadataCoordinator::request_async`] answers from the cache and
//! dispatches fetch jobs for what is missing; fetch jobs later run
//! [`MetadataCoordinator::populate_from_remote`] to fill the cache.
//!
//! Lifecycle of one key across a fetch cycle:
//!
//! ```text
//! Absent -> Pending (request dispatches a job)
//!        -> Absent  (job starts, batch keys deleted)
//!        -> Populated on validated success | Absent on failure
//! ```
//!
//! The read-then-mark sequence is not atomic against the store, so two
//! concurrent requests for the same missing URL may both dispatch a job.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::Error;
use crate::domain::rate_limit_domain;
use crate::entry::{CacheEntry, encode_pending, encode_populated};
use crate::metrics::MetricsSink;
use crate::provider::{ProviderError, RemoteProvider};
use crate::queue::{JobPriority, JobQueue, Task};
use crate::ratelimit::DomainRateLimiter;
use crate::record::ValidatedRecord;
use crate::store::KeyValueCache;
use crate::validate::RecordValidator;

/// Injected knobs for one coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Cache keys are `{key_prefix}:{url}`.
    pub key_prefix: String,
    /// TTL of populated records.
    pub data_ttl: Duration,
    /// TTL of the in-flight marker.
    pub pending_ttl: Duration,
    /// How long a dispatched job may wait in the queue.
    pub job_ttl: Duration,
    /// Maximum URLs per fetch job.
    pub batch_size: usize,
    pub blocked_domains: Vec<String>,
}

/// Coordinates cache reads, job dispatch and remote population for one provider.
pub struct MetadataCoordinator {
    settings: CoordinatorSettings,
    cache: Arc<dyn KeyValueCache>,
    queue: Arc<dyn JobQueue>,
    provider: Arc<dyn RemoteProvider>,
    limiter: DomainRateLimiter,
    validator: RecordValidator,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for MetadataCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCoordinator")
            .field("provider", &self.provider.kind())
            .field("settings", &self.settings)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl MetadataCoordinator {
    pub fn new(
        settings: CoordinatorSettings, cache: Arc<dyn KeyValueCache>, queue: Arc<dyn JobQueue>,
        provider: Arc<dyn RemoteProvider>, limiter: DomainRateLimiter, metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let validator = RecordValidator::new(&settings.blocked_domains);
        Self { settings, cache, queue, provider, limiter, validator, metrics }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.kind().as_str()
    }

    pub fn cache_key(&self, url: &str) -> String {
        format!("{}:{}", self.settings.key_prefix, url)
    }

    /// Return cached records and dispatch fetch jobs for missing URLs.
    ///
    /// URLs already pending are left out of the result; callers retry
    /// later. Missing URLs over their domain's rate budget are dropped
    /// silently and stay absent.
    ///
    /// # Errors
    ///
    /// Cache read, cache write and rate-counter failures are returned.
    /// Job enqueue failures are counted and swallowed.
    pub async fn request_async(&self, urls: &[String]) -> Result<HashMap<String, ValidatedRecord>, Error> {
        let urls = dedupe(urls);
        if urls.is_empty() {
            return Ok(HashMap::new());
        }

        let mut found = HashMap::new();
        let mut missing = Vec::new();
        let mut pending = 0usize;

        for (url, entry) in self.lookup(&urls).await? {
            match entry {
                CacheEntry::Populated(record) => {
                    found.insert(url, record);
                }
                CacheEntry::Pending => pending += 1,
                CacheEntry::Absent => missing.push(url),
            }
        }

        if pending > 0 {
            self.metrics.incr("request_in_job_queue");
        }

        tracing::debug!(
            provider = self.provider_name(),
            cached = found.len(),
            pending,
            missing = missing.len(),
            "metadata request partitioned"
        );

        if !missing.is_empty() {
            let admitted = self.admit(missing).await?;
            self.dispatch(&admitted).await?;
        }

        Ok(found)
    }

    /// Return only the URLs whose records are currently cached.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheDecode` if any cached payload is malformed, and
    /// any store error.
    pub async fn get_cached(&self, urls: &[String]) -> Result<HashMap<String, ValidatedRecord>, Error> {
        let urls = dedupe(urls);
        let found = self
            .lookup(&urls)
            .await?
            .into_iter()
            .filter_map(|(url, entry)| entry.populated().map(|record| (url, record)))
            .collect();
        Ok(found)
    }

    /// Fetch a batch from the provider and cache every record that validates.
    ///
    /// Every key in the batch is deleted first, so a failed fetch leaves the
    /// batch absent (retryable) rather than pending. Previously populated
    /// data for these keys is lost even when the fetch fails.
    ///
    /// # Errors
    ///
    /// Provider failures abort the call after the delete and before any
    /// write. Store failures are returned as-is.
    pub async fn populate_from_remote(&self, urls: &[String]) -> Result<HashMap<String, ValidatedRecord>, Error> {
        let urls = dedupe(urls);
        let keys: Vec<String> = urls.iter().map(|u| self.cache_key(u)).collect();
        self.cache.delete(&keys).await?;

        let mut remote = self.fetch_remote(&urls).await?;

        let mut populated = HashMap::new();
        for (url, key) in urls.iter().zip(&keys) {
            let Some(raw) = remote.remove(url) else {
                continue;
            };

            match self.validator.validate(&raw) {
                Ok(record) => {
                    let bytes = encode_populated(key, &record)?;
                    self.cache.set_with_ttl(key, &bytes, self.settings.data_ttl).await?;
                    self.metrics.incr("cache_write");
                    populated.insert(url.clone(), record);
                }
                Err(e) => {
                    tracing::debug!(provider = self.provider_name(), url = %url, error = %e, "dropping invalid record");
                    self.metrics.incr("record_validation_failure");
                }
            }
        }

        tracing::info!(
            provider = self.provider_name(),
            requested = urls.len(),
            cached = populated.len(),
            "populated metadata batch"
        );

        Ok(populated)
    }

    async fn lookup(&self, urls: &[String]) -> Result<Vec<(String, CacheEntry<ValidatedRecord>)>, Error> {
        let keys: Vec<String> = urls.iter().map(|u| self.cache_key(u)).collect();
        let values = self.cache.get_many(&keys).await?;

        urls.iter()
            .zip(keys.iter().zip(values))
            .map(|(url, (key, raw))| {
                let entry = CacheEntry::decode(key, raw.as_deref())?;
                match entry {
                    CacheEntry::Absent => self.metrics.incr("cache_miss"),
                    _ => self.metrics.incr("cache_hit"),
                }
                Ok((url.clone(), entry))
            })
            .collect()
    }

    /// Keep the URLs whose domain is within its rate budget, in input order.
    async fn admit(&self, urls: Vec<String>) -> Result<Vec<String>, Error> {
        let mut admitted = Vec::with_capacity(urls.len());
        for url in urls {
            let domain = rate_limit_domain(&url);
            if self.limiter.check_and_admit(&domain).await? {
                admitted.push(url);
            } else {
                tracing::debug!(domain = %domain, url = %url, "domain rate limit exceeded");
                self.metrics.incr("domain_rate_limit_exceeded");
            }
        }
        Ok(admitted)
    }

    /// Mark each batch pending, then enqueue it.
    async fn dispatch(&self, urls: &[String]) -> Result<(), Error> {
        let marker = encode_pending();

        for batch in urls.chunks(self.settings.batch_size.max(1)) {
            // The marker must exist before a job can be trusted to run.
            for url in batch {
                self.cache
                    .set_with_ttl(&self.cache_key(url), &marker, self.settings.pending_ttl)
                    .await?;
                self.metrics.incr("cache_write");
            }

            let task = Task::FetchMetadata { provider: self.provider.kind(), urls: batch.to_vec() };
            match self.queue.enqueue(task, self.settings.job_ttl, JobPriority::High).await {
                Ok(handle) => {
                    tracing::debug!(provider = self.provider_name(), job = handle.id, urls = batch.len(), "fetch job queued");
                    self.metrics.gauge("fetch_job_create", batch.len() as u64);
                    if let Ok(size) = self.queue.pending_count().await {
                        self.metrics.gauge("fetch_job_queue_size", size);
                    }
                }
                Err(e) => {
                    tracing::warn!(provider = self.provider_name(), error = %e, urls = batch.len(), "failed to queue fetch job");
                    self.metrics.incr("fetch_job_create_fail");
                }
            }
        }

        Ok(())
    }

    async fn fetch_remote(&self, urls: &[String]) -> Result<HashMap<String, Value>, ProviderError> {
        let name = self.provider_name();
        self.metrics.gauge(&format!("{name}_request_url_count"), urls.len() as u64);

        let start = Instant::now();
        let result = self.provider.fetch_batch(urls).await;
        self.metrics.timing(&format!("{name}_request_timer"), start.elapsed());

        let raw = result.inspect_err(|e| {
            tracing::warn!(provider = name, error = %e, "provider request failed");
            self.metrics.incr(&format!("{name}_request_failure"));
        })?;
        self.metrics.incr(&format!("{name}_request_success"));

        self.provider.parse(urls, &raw).inspect_err(|e| {
            tracing::warn!(provider = name, error = %e, "provider response unparseable");
            self.metrics.incr(&format!("{name}_parse_failure"));
        })
    }
}

/// Drop repeated URLs, keeping first-occurrence order.
fn dedupe(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.iter().filter(|u| seen.insert(u.as_str())).cloned().collect()
}
