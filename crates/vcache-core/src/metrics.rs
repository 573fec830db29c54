//! Prometheus counters for refreshes and served requests.
//!
//! Metrics are registered on an injected [`Registry`] rather than the global
//! default one, so several caches can coexist in one test binary.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::CacheResult;

/// Container for all cache metrics.
#[derive(Clone)]
pub struct Metrics {
    /// Successful downloads that replaced a local copy - labels: key
    pub refreshes_total: IntCounterVec,

    /// Per-cycle fetch failures - labels: key
    pub refresh_failures_total: IntCounterVec,

    /// Placeholder publications for stale `vehicles` - labels: track
    pub stale_fallbacks_total: IntCounterVec,

    /// Served requests - labels: path, method, status
    pub http_requests_total: IntCounterVec,
}

impl Metrics {
    /// Create and register all metrics with `registry`.
    pub fn new(registry: &Registry) -> CacheResult<Self> {
        let metrics = Self {
            refreshes_total: IntCounterVec::new(
                Opts::new("vcache_refreshes_total", "Remote refreshes by key"),
                &["key"],
            )?,
            refresh_failures_total: IntCounterVec::new(
                Opts::new("vcache_refresh_failures_total", "Failed refreshes by key"),
                &["key"],
            )?,
            stale_fallbacks_total: IntCounterVec::new(
                Opts::new(
                    "vcache_stale_fallbacks_total",
                    "Stale vehicles replaced by the empty placeholder",
                ),
                &["track"],
            )?,
            http_requests_total: IntCounterVec::new(
                Opts::new("vcache_http_requests_total", "HTTP requests"),
                &["path", "method", "status"],
            )?,
        };

        registry.register(Box::new(metrics.refreshes_total.clone()))?;
        registry.register(Box::new(metrics.refresh_failures_total.clone()))?;
        registry.register(Box::new(metrics.stale_fallbacks_total.clone()))?;
        registry.register(Box::new(metrics.http_requests_total.clone()))?;

        Ok(metrics)
    }

    pub fn record_refresh(&self, key: &str) {
        self.refreshes_total.with_label_values(&[key]).inc();
    }

    pub fn record_refresh_failure(&self, key: &str) {
        self.refresh_failures_total.with_label_values(&[key]).inc();
    }

    pub fn record_stale_fallback(&self, track: &str) {
        self.stale_fallbacks_total.with_label_values(&[track]).inc();
    }

    pub fn record_http_request(&self, path: &str, method: &str, status: u16) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[path, method, status.as_str()])
            .inc();
    }
}

/// Render `registry` in the Prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> CacheResult<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}
