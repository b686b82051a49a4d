//! Prometheus metrics for the catalog engine.
//!
//! This module provides metrics for:
//! - Shard cache (hits, misses, evictions, resident shards)
//! - Shard loader (loads by result, decode latency)
//! - Pagination sessions (stale results discarded)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Registry holding every catalog metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Shard Cache
// =============================================================================

/// Cache lookups that found the shard resident.
pub static CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("shardcat_cache_hits_total", "Total shard cache hits").unwrap()
});

/// Cache lookups that missed.
pub static CACHE_MISSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("shardcat_cache_misses_total", "Total shard cache misses").unwrap()
});

/// Shards evicted to respect the cache bound.
pub static CACHE_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shardcat_cache_evictions_total",
        "Total shards evicted from the cache",
    )
    .unwrap()
});

/// Shards currently resident.
pub static CACHE_RESIDENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "shardcat_cache_resident_shards",
        "Number of shards currently resident in the cache",
    )
    .unwrap()
});

// =============================================================================
// Shard Loader
// =============================================================================

/// Shard loads by result.
pub static SHARD_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shardcat_shard_loads_total", "Total shard loads"),
        &["result"], // "ok", "not_found", "decode", "io", "worker"
    )
    .unwrap()
});

/// Time spent decoding shard payloads.
pub static SHARD_DECODE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "shardcat_shard_decode_duration_seconds",
            "Duration of shard decoding on the blocking pool",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .unwrap()
});

// =============================================================================
// Pagination
// =============================================================================

/// Load results discarded because the session moved on.
pub static STALE_RESULTS_DISCARDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shardcat_stale_results_discarded_total",
        "Shard results discarded because their category session was superseded",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // Cache
    registry.register(Box::new(CACHE_HITS.clone())).unwrap();
    registry.register(Box::new(CACHE_MISSES.clone())).unwrap();
    registry.register(Box::new(CACHE_EVICTIONS.clone())).unwrap();
    registry.register(Box::new(CACHE_RESIDENT.clone())).unwrap();

    // Loader
    registry.register(Box::new(SHARD_LOADS.clone())).unwrap();
    registry
        .register(Box::new(SHARD_DECODE_DURATION.clone()))
        .unwrap();

    // Pagination
    registry
        .register(Box::new(STALE_RESULTS_DISCARDED.clone()))
        .unwrap();
}

/// Render all catalog metrics in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
