//! Injected metrics sink.
//!
//! Components receive a sink at construction instead of reaching for a
//! process-global stats client.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub trait MetricsSink: Send + Sync {
    fn incr(&self, name: &str);

    fn gauge(&self, name: &str, value: u64);

    fn timing(&self, name: &str, elapsed: Duration);
}

/// Emits every metric as a structured `tracing` event.
#[derive(Debug, Clone)]
pub struct TracingMetrics {
    prefix: String,
}

impl TracingMetrics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for TracingMetrics {
    fn default() -> Self {
        Self::new("linkmeta")
    }
}

impl MetricsSink for TracingMetrics {
    fn incr(&self, name: &str) {
        tracing::debug!(target: "linkmeta::metrics", prefix = %self.prefix, metric = name, kind = "counter", value = 1u64);
    }

    fn gauge(&self, name: &str, value: u64) {
        tracing::debug!(target: "linkmeta::metrics", prefix = %self.prefix, metric = name, kind = "gauge", value);
    }

    fn timing(&self, name: &str, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        tracing::debug!(target: "linkmeta::metrics", prefix = %self.prefix, metric = name, kind = "timing", ms);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _name: &str) {}

    fn gauge(&self, _name: &str, _value: u64) {}

    fn timing(&self, _name: &str, _elapsed: Duration) {}
}

/// In-memory sink that keeps counter totals and last gauge values.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, u64>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .map(|c| c.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn last_gauge(&self, name: &str) -> Option<u64> {
        self.gauges.lock().ok().and_then(|g| g.get(name).copied())
    }
}

impl MetricsSink for CountingMetrics {
    fn incr(&self, name: &str) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn gauge(&self, name: &str, value: u64) {
        if let Ok(mut gauges) = self.gauges.lock() {
            gauges.insert(name.to_string(), value);
        }
    }

    fn timing(&self, name: &str, _elapsed: Duration) {
        self.incr(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_metrics() {
        let metrics = CountingMetrics::new();
        metrics.incr("cache_hit");
        metrics.incr("cache_hit");
        metrics.gauge("fetch_job_create", 5);
        metrics.gauge("fetch_job_create", 3);

        assert_eq!(metrics.count("cache_hit"), 2);
        assert_eq!(metrics.count("cache_miss"), 0);
        assert_eq!(metrics.last_gauge("fetch_job_create"), Some(3));
    }
}
