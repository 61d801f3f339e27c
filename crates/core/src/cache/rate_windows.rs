//! Fixed-window counter storage for the domain rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::TransactionBehavior;

use super::connection::CacheDb;
use super::now_millis;
use crate::Error;
use crate::ratelimit::RateCounter;

impl CacheDb {
    /// Increment a window counter and return its new value.
    ///
    /// Windows that ended before now are purged in the same transaction.
    pub async fn increment_rate_window(
        &self, action: &str, domain: &str, window_start: i64, period: Duration,
    ) -> Result<u64, Error> {
        let action = action.to_string();
        let domain = domain.to_string();
        let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX);
        let expires_at = window_start.saturating_add(period_ms);
        let now = now_millis();

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                tx.execute("DELETE FROM rate_windows WHERE expires_at <= ?1", params![now])?;

                tx.execute(
                    "INSERT INTO rate_windows (action, domain, window_start, count, expires_at)
                    VALUES (?1, ?2, ?3, 1, ?4)
                    ON CONFLICT(action, domain, window_start) DO UPDATE SET
                        count = count + 1",
                    params![action, domain, window_start, expires_at],
                )?;

                let count: i64 = tx.query_row(
                    "SELECT count FROM rate_windows WHERE action = ?1 AND domain = ?2 AND window_start = ?3",
                    params![action, domain, window_start],
                    |row| row.get(0),
                )?;

                tx.commit()?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl RateCounter for CacheDb {
    async fn increment_window(
        &self, action: &str, domain: &str, window_start: i64, period: Duration,
    ) -> Result<u64, Error> {
        self.increment_rate_window(action, domain, window_start, period).await
    }
}
