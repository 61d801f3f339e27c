//! Per-domain fixed-window rate limiting.
//!
//! Counters live in the shared store, so every coordinator instance sees
//! the same budget for a domain. Windows are aligned to wall-clock
//! multiples of the period; a burst straddling a boundary may admit up to
//! twice the limit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::Error;

/// Default action name for metadata fetch admission.
pub const DOMAIN_LIMIT_ACTION: &str = "domain_limit";

/// Shared counter keyed by `(action, domain, window_start)`.
#[async_trait]
pub trait RateCounter: Send + Sync {
    /// Increment the counter for a window and return the post-increment count.
    async fn increment_window(
        &self, action: &str, domain: &str, window_start: i64, period: Duration,
    ) -> Result<u64, Error>;
}

/// Fixed-window admission check keyed by registrable domain.
#[derive(Clone)]
pub struct DomainRateLimiter {
    counter: Arc<dyn RateCounter>,
    action: String,
    limit: u64,
    period: Duration,
}

impl std::fmt::Debug for DomainRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRateLimiter")
            .field("action", &self.action)
            .field("limit", &self.limit)
            .field("period", &self.period)
            .finish()
    }
}

impl DomainRateLimiter {
    pub fn new(counter: Arc<dyn RateCounter>, action: impl Into<String>, limit: u64, period: Duration) -> Self {
        Self { counter, action: action.into(), limit, period }
    }

    /// Count one attempt for `domain` and report whether it is within budget.
    ///
    /// Denied attempts still count, so a hot domain stays denied for the
    /// rest of the window.
    pub async fn check_and_admit(&self, domain: &str) -> Result<bool, Error> {
        let window_start = window_start(chrono::Utc::now().timestamp_millis(), self.period);
        let count = self
            .counter
            .increment_window(&self.action, domain, window_start, self.period)
            .await?;

        Ok(count <= self.limit)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Start of the fixed window containing `now_ms`.
pub(crate) fn window_start(now_ms: i64, period: Duration) -> i64 {
    let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
    now_ms - now_ms.rem_euclid(period_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheDb;

    fn limiter(db: &CacheDb, limit: u64) -> DomainRateLimiter {
        DomainRateLimiter::new(Arc::new(db.clone()), DOMAIN_LIMIT_ACTION, limit, Duration::from_secs(3600))
    }

    #[test]
    fn test_window_start_alignment() {
        assert_eq!(window_start(12_345, Duration::from_secs(1)), 12_000);
        assert_eq!(window_start(12_000, Duration::from_secs(1)), 12_000);
        assert_eq!(window_start(59_999, Duration::from_secs(60)), 0);
    }

    #[tokio::test]
    async fn test_admits_up_to_limit() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let limiter = limiter(&db, 2);

        assert!(limiter.check_and_admit("example.com").await.unwrap());
        assert!(limiter.check_and_admit("example.com").await.unwrap());
        assert!(!limiter.check_and_admit("example.com").await.unwrap());
        assert!(!limiter.check_and_admit("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_domains_are_independent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let limiter = limiter(&db, 1);

        assert!(limiter.check_and_admit("example.com").await.unwrap());
        assert!(!limiter.check_and_admit("example.com").await.unwrap());
        assert!(limiter.check_and_admit("example.org").await.unwrap());
    }

    #[tokio::test]
    async fn test_counter_shared_between_store_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite");
        let first = CacheDb::open(&path).await.unwrap();
        let second = CacheDb::open(&path).await.unwrap();

        assert!(limiter(&first, 1).check_and_admit("example.com").await.unwrap());
        assert!(!limiter(&second, 1).check_and_admit("example.com").await.unwrap());
    }
}
