//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Describes the cache metrics. Call once at startup.
pub fn register_cache_metrics() {
    metrics::describe_counter!("twin_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("twin_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "twin_cache_loads_total",
        "Total number of loads started against the backing source"
    );
    metrics::describe_counter!(
        "twin_cache_load_failures_total",
        "Total number of loads that failed or timed out"
    );
    metrics::describe_counter!(
        "twin_cache_evictions_total",
        "Total number of cache evictions"
    );
    metrics::describe_gauge!("twin_cache_entries", "Current number of entries in cache");
    metrics::describe_histogram!(
        "twin_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Metrics recorder for one named cache.
///
/// Keeps local atomic counters next to the global `metrics` facade so tests
/// and logs can read hit rates without a recorder installed.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    cache: Arc<str>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    loads: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new(cache: &str) -> Self {
        Self {
            cache: Arc::from(cache),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            loads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("twin_cache_hits_total", "cache" => self.cache.to_string()).increment(1);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("twin_cache_misses_total", "cache" => self.cache.to_string()).increment(1);
    }

    /// Records a load started against the backing source.
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        counter!("twin_cache_loads_total", "cache" => self.cache.to_string()).increment(1);
    }

    /// Records a failed load; `reason` is `error`, `timeout` or `panic`.
    pub fn record_load_failure(&self, reason: &'static str) {
        counter!(
            "twin_cache_load_failures_total",
            "cache" => self.cache.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_eviction(&self, reason: &'static str) {
        counter!(
            "twin_cache_evictions_total",
            "cache" => self.cache.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn update_entry_count(&self, count: u64) {
        gauge!("twin_cache_entries", "cache" => self.cache.to_string()).set(count as f64);
    }

    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!(
            "twin_cache_operation_seconds",
            "cache" => self.cache.to_string(),
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of loads started, i.e. calls into the loader.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}
