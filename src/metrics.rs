//! Prometheus metrics for the client routing core.
//!
//! This module provides metrics for monitoring a kavka handle:
//! - Request dispatch (count, latency per API)
//! - Recovery (retry attempts, metadata refreshes, coordinator lookups)
//! - Channels (connects, evictions, active count)
//!
//! # Safety
//!
//! All metrics are registered to a custom registry with the "kavka" prefix
//! to avoid name collisions with other libraries using the default
//! Prometheus registry. Registration errors are handled gracefully - if a
//! metric fails to register, an unregistered fallback is used instead of
//! panicking.

use once_cell::sync::Lazy;
use prometheus::{
    opts, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry,
};
use tracing::warn;

/// Custom Prometheus registry for kavka metrics.
/// Using a custom registry prevents name collisions with other libraries.
///
/// The registry is public so embedding applications can gather and expose
/// it however they serve metrics; this crate has no HTTP surface of its
/// own.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("kavka".to_string()), None).unwrap_or_else(|_| Registry::new())
});

// =============================================================================
// Request metrics
// =============================================================================

/// Total number of Kafka API requests sent.
pub static REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "requests_total",
        "Total number of Kafka API requests sent",
        &["api", "status"],
    )
});

/// End-to-end request duration, recovery included.
pub static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec_safe(
        &REGISTRY,
        "request_duration_seconds",
        "End-to-end request duration in seconds, recovery included",
        &["api"],
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ],
    )
});

// =============================================================================
// Recovery metrics
// =============================================================================

/// Retry attempts by policy and outcome.
///
/// Labels:
/// - `policy`: request, bootstrap
/// - `outcome`: attempt, exhausted
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "retry_attempts_total",
        "Retry attempts by policy and outcome",
        &["policy", "outcome"],
    )
});

/// Metadata refresh round-trips actually performed (short-circuited
/// refreshers do not count).
pub static METADATA_REFRESHES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter_safe(
        &REGISTRY,
        "metadata_refreshes_total",
        "Metadata refresh round-trips performed",
    )
});

/// Group coordinator lookups performed.
pub static COORDINATOR_LOOKUPS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter_safe(
        &REGISTRY,
        "coordinator_lookups_total",
        "Group coordinator lookups performed",
    )
});

/// Completed bootstrap rounds.
pub static BOOTSTRAPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "bootstraps_total",
        "Bootstrap rounds by outcome",
        &["status"],
    )
});

// =============================================================================
// Channel metrics
// =============================================================================

/// Channels currently cached in the cluster state.
pub static ACTIVE_CHANNELS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_safe(
        &REGISTRY,
        "active_channels",
        "Broker channels currently open",
    )
});

/// Channel connect attempts by outcome.
pub static CHANNEL_CONNECTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec_safe(
        &REGISTRY,
        "channel_connects_total",
        "Channel connect attempts by outcome",
        &["status"],
    )
});

/// Brokers evicted from the cluster state after channel failures.
pub static BROKER_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter_safe(
        &REGISTRY,
        "broker_evictions_total",
        "Brokers evicted after channel failures",
    )
});

// =============================================================================
// Helpers
// =============================================================================

/// Record a completed request dispatch.
pub fn record_request(api: &str, status: &str, duration_secs: f64) {
    REQUEST_COUNT.with_label_values(&[api, status]).inc();
    REQUEST_DURATION
        .with_label_values(&[api])
        .observe(duration_secs);
}

/// Register an IntGauge safely, returning a fallback on error.
fn register_int_gauge_safe(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGauge metric, using unregistered fallback");
            gauge
        }
    }
}

/// Register an IntCounter safely, returning a fallback on error.
fn register_int_counter_safe(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounter metric, using unregistered fallback");
            counter
        }
    }
}

/// Register an IntCounterVec safely, returning a fallback on error.
fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter =
        IntCounterVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

/// Register a HistogramVec safely, returning a fallback on error.
fn register_histogram_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
    buckets: Vec<f64>,
) -> HistogramVec {
    let histogram = HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        .expect("metric opts should be valid");
    match registry.register(Box::new(histogram.clone())) {
        Ok(()) => histogram,
        Err(e) => {
            warn!(name, error = %e, "Failed to register HistogramVec metric, using unregistered fallback");
            histogram
        }
    }
}
