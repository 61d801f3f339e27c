//! Fetch-job queue abstraction.
//!
//! Jobs are fire-and-forget: the dispatcher never joins on a job, it only
//! observes results later through the cache. A queued job that is not
//! claimed within its TTL is discarded by the queue.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::provider::ProviderKind;

/// Work carried by a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Populate the cache for one batch of URLs from one provider.
    FetchMetadata { provider: ProviderKind, urls: Vec<String> },
    /// Refresh the cached recommendation list.
    RefreshRecommendations,
}

impl Task {
    /// Prefix for the worker's per-task metrics.
    pub fn metric_prefix(&self) -> &'static str {
        match self {
            Task::FetchMetadata { provider: ProviderKind::Embedly, .. } => "task_fetch_url",
            Task::FetchMetadata { provider: ProviderKind::Mozilla, .. } => "task_fetch_mozilla",
            Task::RefreshRecommendations => "task_fetch_recommended",
        }
    }
}

/// Claim order. Higher priorities are claimed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Normal,
    High,
}

impl JobPriority {
    pub fn as_i64(self) -> i64 {
        match self {
            JobPriority::Normal => 0,
            JobPriority::High => 1,
        }
    }
}

/// Handle returned by [`JobQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: i64,
}

/// A job removed from the queue by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub handle: JobHandle,
    pub task: Task,
    /// Enqueue time in unix milliseconds.
    pub enqueued_at: i64,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, task: Task, ttl: Duration, priority: JobPriority) -> Result<JobHandle, Error>;

    /// Number of live jobs waiting to be claimed.
    async fn pending_count(&self) -> Result<u64, Error>;
}
