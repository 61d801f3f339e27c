//! Core types and shared functionality for linkmeta.
//!
//! This crate provides:
//! - SQLite-backed store for cache entries, fetch jobs and rate windows
//! - Unified error types
//! - Configuration structures
//! - The metadata coordinator and recommendation cache built on top of them

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod queue;
pub mod ratelimit;
pub mod recommendations;
pub mod record;
pub mod store;
pub mod validate;

pub use cache::CacheDb;
pub use config::{AppConfig, ConfigError};
pub use coordinator::{CoordinatorSettings, MetadataCoordinator};
pub use entry::CacheEntry;
pub use error::Error;
pub use metrics::{CountingMetrics, MetricsSink, NoopMetrics, TracingMetrics};
pub use provider::{ProviderError, ProviderKind, RawRecommendation, RecommendationSource, RemoteProvider};
pub use queue::{ClaimedJob, JobHandle, JobPriority, JobQueue, Task};
pub use ratelimit::{DomainRateLimiter, RateCounter};
pub use recommendations::{Recommendation, RecommendationCache, RecommendationSettings};
pub use record::{Image, ValidatedRecord};
pub use store::KeyValueCache;
pub use validate::{RecordValidator, ValidationError};
