//! Job queue operations.
//!
//! Jobs live in the `jobs` table so that any process sharing the database
//! can dispatch or work them.

use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, TransactionBehavior};

use super::connection::CacheDb;
use super::{expires_at, now_millis};
use crate::Error;
use crate::queue::{ClaimedJob, JobHandle, JobPriority, JobQueue, Task};

impl CacheDb {
    /// Append a job to the queue.
    pub async fn push_job(&self, task: &Task, ttl: Duration, priority: JobPriority) -> Result<JobHandle, Error> {
        let task_json = serde_json::to_string(task)
            .map_err(|e| Error::CacheEncode { key: "jobs".into(), reason: e.to_string() })?;
        let enqueued_at = now_millis();
        let expires_at = expires_at(ttl);
        let priority = priority.as_i64();

        self.conn
            .call(move |conn| -> Result<JobHandle, Error> {
                conn.execute(
                    "INSERT INTO jobs (task_json, priority, enqueued_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                    params![task_json, priority, enqueued_at, expires_at],
                )?;
                Ok(JobHandle { id: conn.last_insert_rowid() })
            })
            .await
            .map_err(Error::from)
    }

    /// Remove and return the next live job.
    ///
    /// Expired jobs are evicted first and never returned. High priority jobs
    /// are claimed before normal ones, oldest first within a priority. The
    /// claim runs in an immediate transaction so concurrent workers never
    /// receive the same job.
    pub async fn claim_next_job(&self) -> Result<Option<ClaimedJob>, Error> {
        let now = now_millis();
        let claimed = self
            .conn
            .call(move |conn| -> Result<Option<(i64, String, i64)>, Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let evicted = tx.execute("DELETE FROM jobs WHERE expires_at <= ?1", params![now])?;
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted expired jobs");
                }

                let next = tx.query_row(
                    "SELECT id, task_json, enqueued_at FROM jobs ORDER BY priority DESC, id ASC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                let next = match next {
                    Ok(row) => Some(row),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };

                if let Some((id, _, _)) = &next {
                    tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
                }

                tx.commit()?;
                Ok(next)
            })
            .await
            .map_err(Error::from)?;

        let Some((id, task_json, enqueued_at)) = claimed else {
            return Ok(None);
        };

        let task = serde_json::from_str(&task_json).map_err(|e| Error::JobDecode { id, reason: e.to_string() })?;

        Ok(Some(ClaimedJob { handle: JobHandle { id }, task, enqueued_at }))
    }

    /// Count live jobs.
    pub async fn count_jobs(&self) -> Result<u64, Error> {
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM jobs WHERE expires_at > ?1", params![now], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl JobQueue for CacheDb {
    async fn enqueue(&self, task: Task, ttl: Duration, priority: JobPriority) -> Result<JobHandle, Error> {
        self.push_job(&task, ttl, priority).await
    }

    async fn pending_count(&self) -> Result<u64, Error> {
        self.count_jobs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    fn fetch_task(urls: &[&str]) -> Task {
        Task::FetchMetadata { provider: ProviderKind::Embedly, urls: urls.iter().map(|u| u.to_string()).collect() }
    }

    #[tokio::test]
    async fn test_enqueue_and_claim() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let task = fetch_task(&["https://example.com/a"]);

        let handle = db.enqueue(task.clone(), Duration::from_secs(60), JobPriority::High).await.unwrap();
        assert_eq!(db.pending_count().await.unwrap(), 1);

        let claimed = db.claim_next_job().await.unwrap().unwrap();
        assert_eq!(claimed.handle, handle);
        assert_eq!(claimed.task, task);
        assert_eq!(db.pending_count().await.unwrap(), 0);
        assert!(db.claim_next_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_high_priority_claimed_first() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue(Task::RefreshRecommendations, Duration::from_secs(60), JobPriority::Normal)
            .await
            .unwrap();
        db.enqueue(fetch_task(&["https://example.com/1"]), Duration::from_secs(60), JobPriority::High)
            .await
            .unwrap();
        db.enqueue(fetch_task(&["https://example.com/2"]), Duration::from_secs(60), JobPriority::High)
            .await
            .unwrap();

        let order: Vec<Task> = vec![
            db.claim_next_job().await.unwrap().unwrap().task,
            db.claim_next_job().await.unwrap().unwrap().task,
            db.claim_next_job().await.unwrap().unwrap().task,
        ];
        assert_eq!(
            order,
            vec![
                fetch_task(&["https://example.com/1"]),
                fetch_task(&["https://example.com/2"]),
                Task::RefreshRecommendations,
            ]
        );
    }

    #[tokio::test]
    async fn test_expired_jobs_are_evicted() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue(fetch_task(&["https://example.com/stale"]), Duration::from_millis(1), JobPriority::High)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(db.pending_count().await.unwrap(), 0);
        assert!(db.claim_next_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_job_is_reported() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let expires = expires_at(Duration::from_secs(60));
        db.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO jobs (task_json, priority, enqueued_at, expires_at) VALUES ('not json', 0, 0, ?1)",
                    params![expires],
                )
            })
            .await
            .unwrap();

        let result = db.claim_next_job().await;
        assert!(matches!(result, Err(Error::JobDecode { .. })));
        assert_eq!(db.pending_count().await.unwrap(), 0);
    }
}
