//! SQLite-backed shared store.
//!
//! One database file holds all state that linkmeta processes share:
//!
//! - `entries`: TTL-bounded key/value cache ([`crate::store::KeyValueCache`])
//! - `jobs`: fetch-job queue ([`crate::queue::JobQueue`])
//! - `rate_windows`: fixed-window counters ([`crate::ratelimit::RateCounter`])
//!
//! Expiry is evaluated on read; expired rows are purged opportunistically.

pub mod connection;
pub mod entries;
pub mod jobs;
pub mod migrations;
pub mod rate_windows;

use std::time::Duration;

pub use crate::Error;

pub use connection::CacheDb;

/// Current wall-clock time in unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry for a TTL starting now.
pub(crate) fn expires_at(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}
