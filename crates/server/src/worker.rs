//! Background fetch-job worker.
//!
//! Claims jobs from the shared queue and runs them against the matching
//! coordinator or the recommendation cache. A failed job is logged and
//! dropped; its keys stay absent and the next request reschedules them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use linkmeta_core::{ClaimedJob, Error, Task};
use tokio::sync::watch;

use crate::state::AppState;

/// Expired entries are purged at most this often.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub struct Worker {
    state: Arc<AppState>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(state: Arc<AppState>, poll_interval: Duration) -> Self {
        Self { state, poll_interval }
    }

    /// Claim and run one job. Returns `false` when the queue was empty.
    ///
    /// # Errors
    ///
    /// Only claim failures are returned; job failures are logged.
    pub async fn run_once(&self) -> Result<bool, Error> {
        let job = match self.state.db.claim_next_job().await {
            Ok(Some(job)) => job,
            Ok(None) => return Ok(false),
            Err(Error::JobDecode { id, reason }) => {
                tracing::error!(job = id, reason = %reason, "discarding undecodable job");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let id = job.handle.id;
        let prefix = job.task.metric_prefix();
        let is_fetch = matches!(job.task, Task::FetchMetadata { .. });
        let enqueued_at = job.enqueued_at;
        let waited_ms = chrono::Utc::now().timestamp_millis() - enqueued_at;
        let start = Instant::now();
        self.state.metrics.incr(&format!("{prefix}_start"));

        match self.run_job(job).await {
            Ok(count) => {
                if is_fetch {
                    self.state.metrics.gauge(&format!("{prefix}_cached"), count as u64);
                }
                // Measured from enqueue, so queue wait is included.
                let total_ms = (chrono::Utc::now().timestamp_millis() - enqueued_at).max(0) as u64;
                self.state.metrics.timing(&format!("{prefix}_time"), Duration::from_millis(total_ms));
                tracing::info!(job = id, waited_ms, elapsed_ms = start.elapsed().as_millis() as u64, count, "job finished")
            }
            Err(e) => tracing::warn!(job = id, waited_ms, error = %e, "job failed"),
        }

        Ok(true)
    }

    async fn run_job(&self, job: ClaimedJob) -> Result<usize, Error> {
        match job.task {
            Task::FetchMetadata { provider, urls } => {
                let populated = self.state.coordinator(provider)?.populate_from_remote(&urls).await?;
                Ok(populated.len())
            }
            Task::RefreshRecommendations => {
                let list = self.state.recommendations()?.refresh().await?;
                Ok(list.len())
            }
        }
    }

    /// Drain the queue until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(poll_ms = self.poll_interval.as_millis() as u64, "fetch worker started");
        let mut last_purge = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let busy = match self.run_once().await {
                Ok(busy) => busy,
                Err(e) => {
                    tracing::error!(error = %e, "failed to claim job");
                    false
                }
            };

            if busy {
                continue;
            }

            if last_purge.elapsed() >= PURGE_INTERVAL {
                match self.state.db.purge_expired_entries().await {
                    Ok(purged) if purged > 0 => tracing::debug!(purged, "purged expired entries"),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to purge expired entries"),
                }
                last_purge = Instant::now();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("fetch worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubProvider, StubSource, config, state_with};
    use linkmeta_core::{CacheDb, CountingMetrics, JobPriority, JobQueue, ProviderKind, RawRecommendation};
    use serde_json::json;

    #[tokio::test]
    async fn test_run_once_empty_queue() {
        let state = Arc::new(state_with(StubProvider::new(ProviderKind::Embedly, Vec::new())).await);
        let worker = Worker::new(state, Duration::from_millis(10));
        assert!(!worker.run_once().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_once_populates_requested_urls() {
        let u = "https://example.com/a";
        let state = Arc::new(
            state_with(StubProvider::new(ProviderKind::Embedly, vec![json!({"original_url": u, "title": "A"})])).await,
        );
        let coordinator = state.coordinator(ProviderKind::Embedly).unwrap().clone();

        assert!(coordinator.request_async(&[u.to_string()]).await.unwrap().is_empty());

        let worker = Worker::new(state.clone(), Duration::from_millis(10));
        assert!(worker.run_once().await.unwrap());
        assert!(!worker.run_once().await.unwrap());

        let cached = coordinator.get_cached(&[u.to_string()]).await.unwrap();
        assert_eq!(cached[u].title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_job_for_unconfigured_provider_is_dropped() {
        let state = Arc::new(state_with(StubProvider::new(ProviderKind::Embedly, Vec::new())).await);
        let task = Task::FetchMetadata { provider: ProviderKind::Mozilla, urls: vec!["https://example.com".into()] };
        state.db.enqueue(task, Duration::from_secs(30), JobPriority::High).await.unwrap();

        let worker = Worker::new(state.clone(), Duration::from_millis(10));
        assert!(worker.run_once().await.unwrap());
        assert_eq!(state.db.count_jobs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_job() {
        let state = state_with(StubProvider::new(ProviderKind::Embedly, Vec::new())).await.with_recommendations(
            &config(),
            Arc::new(StubSource(vec![RawRecommendation { url: "https://example.com/r".into(), published_at: None }])),
        );
        let state = Arc::new(state);

        assert!(state.recommendations().unwrap().get_or_schedule().await.unwrap().is_empty());

        let worker = Worker::new(state.clone(), Duration::from_millis(10));
        assert!(worker.run_once().await.unwrap());

        let list = state.recommendations().unwrap().get_or_schedule().await.unwrap();
        assert_eq!(list.len(), 1);
    }

    async fn counted_state(provider: StubProvider) -> (Arc<AppState>, Arc<CountingMetrics>) {
        let config = config();
        let metrics = Arc::new(CountingMetrics::new());
        let db = CacheDb::open_in_memory().await.unwrap();
        let state = AppState::empty(&config, db, metrics.clone())
            .with_provider(&config, Arc::new(provider))
            .with_recommendations(
                &config,
                Arc::new(StubSource(vec![RawRecommendation { url: "https://example.com/r".into(), published_at: None }])),
            );
        (Arc::new(state), metrics)
    }

    #[tokio::test]
    async fn test_fetch_job_metrics_keyed_by_provider() {
        let u = "https://example.com/a";
        let (state, metrics) =
            counted_state(StubProvider::new(ProviderKind::Mozilla, vec![json!({"original_url": u, "title": "A"})])).await;

        state.coordinator(ProviderKind::Mozilla).unwrap().request_async(&[u.to_string()]).await.unwrap();
        assert!(Worker::new(state.clone(), Duration::from_millis(10)).run_once().await.unwrap());

        assert_eq!(metrics.count("task_fetch_mozilla_start"), 1);
        assert_eq!(metrics.last_gauge("task_fetch_mozilla_cached"), Some(1));
        assert_eq!(metrics.count("task_fetch_mozilla_time"), 1);
        assert_eq!(metrics.count("task_fetch_url_start"), 0);
    }

    #[tokio::test]
    async fn test_embedly_job_uses_url_prefix() {
        let u = "https://example.com/a";
        let (state, metrics) =
            counted_state(StubProvider::new(ProviderKind::Embedly, vec![json!({"original_url": u})])).await;

        state.coordinator(ProviderKind::Embedly).unwrap().request_async(&[u.to_string()]).await.unwrap();
        assert!(Worker::new(state.clone(), Duration::from_millis(10)).run_once().await.unwrap());

        assert_eq!(metrics.count("task_fetch_url_start"), 1);
        assert_eq!(metrics.last_gauge("task_fetch_url_cached"), Some(1));
        assert_eq!(metrics.count("task_fetch_url_time"), 1);
    }

    #[tokio::test]
    async fn test_refresh_job_metrics() {
        let (state, metrics) = counted_state(StubProvider::new(ProviderKind::Embedly, Vec::new())).await;

        state.recommendations().unwrap().get_or_schedule().await.unwrap();
        assert_eq!(metrics.count("request_recommended_job_create"), 1);

        assert!(Worker::new(state.clone(), Duration::from_millis(10)).run_once().await.unwrap());
        assert_eq!(metrics.count("task_fetch_recommended_start"), 1);
        assert_eq!(metrics.count("task_fetch_recommended_time"), 1);
        assert_eq!(metrics.count("pocket_request_timer"), 1);
        assert_eq!(metrics.count("pocket_request_success"), 1);
        assert_eq!(metrics.last_gauge("task_fetch_recommended_cached"), None);
    }

    #[tokio::test]
    async fn test_failed_job_counts_start_only() {
        let (state, metrics) = counted_state(StubProvider::new(ProviderKind::Embedly, Vec::new())).await;
        let task = Task::FetchMetadata { provider: ProviderKind::Mozilla, urls: vec!["https://example.com".into()] };
        state.db.enqueue(task, Duration::from_secs(30), JobPriority::High).await.unwrap();

        assert!(Worker::new(state.clone(), Duration::from_millis(10)).run_once().await.unwrap());
        assert_eq!(metrics.count("task_fetch_mozilla_start"), 1);
        assert_eq!(metrics.count("task_fetch_mozilla_time"), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let state = Arc::new(state_with(StubProvider::new(ProviderKind::Embedly, Vec::new())).await);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Worker::new(state, Duration::from_millis(5)).run(rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
