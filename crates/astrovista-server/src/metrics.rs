//! Prometheus metrics for the AstroVista server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Cache metrics (hit/miss by tier)
//! - Rate limiter rejections and translation provider calls

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

use astrovista_core::ApodDate;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";

    // Rate limiting
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "rate_limit_rejections_total";

    // Translation
    pub const TRANSLATION_REQUESTS_TOTAL: &str = "translation_requests_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics is served by the router.
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string(),
        "status_class" => status_class
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

pub fn record_cache_hit(tier: &str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_cache_miss(tier: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "tier" => tier.to_string()).increment(1);
}

pub fn record_rate_limit_rejection() {
    counter!(names::RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
}

pub fn record_translation_request(provider: &str, success: bool) {
    counter!(
        names::TRANSLATION_REQUESTS_TOTAL,
        "provider" => provider.to_string(),
        "outcome" => if success { "ok" } else { "error" }
    )
    .increment(1);
}

/// Collapses date segments so `/apod/2023-01-15` is counted as
/// `/apod/{date}`.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|part| {
            if part.parse::<ApodDate>().is_ok() || looks_like_date(part) {
                "{date}"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Malformed dates are collapsed as well, to bound label cardinality.
fn looks_like_date(part: &str) -> bool {
    part.len() >= 8 && part.chars().all(|c| c.is_ascii_digit() || c == '-')
}
