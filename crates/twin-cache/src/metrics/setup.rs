//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::cache::register_cache_metrics;

/// Histogram buckets for cache operations and loads, in seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.0001, // 100 microseconds
    0.0005, // 500 microseconds
    0.001,  // 1 millisecond
    0.005,  // 5 milliseconds
    0.01,   // 10 milliseconds
    0.05,   // 50 milliseconds
    0.1,    // 100 milliseconds
    0.5,    // 500 milliseconds
    1.0,    // 1 second
    5.0,    // 5 seconds
    10.0,   // 10 seconds (default load timeout)
];

/// Installs the Prometheus recorder and describes the cache metrics.
///
/// Returns the handle the embedding process renders on its scrape endpoint.
/// Fails if a global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)?
        .install_recorder()?;

    register_cache_metrics();
    info!("Metrics system initialized");
    Ok(handle)
}
