use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::cache::{CacheStats, Deadline};
use crate::i18n::Language;
use crate::i18n::locales::APOD_TITLE;
use crate::response::PrettyJson;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct ReadinessResponse<'a> {
    status: &'a str,
    storage: ComponentStatus<'a>,
    cache: ComponentStatus<'a>,
    translation_cache: LocalCacheStatus,
}

/// Tier 1 translation cache counters since startup.
#[derive(Serialize)]
struct LocalCacheStatus {
    size: usize,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    hit_rate: f64,
}

impl From<CacheStats> for LocalCacheStatus {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            size: stats.size,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
        }
    }
}

#[derive(Serialize)]
struct ComponentStatus<'a> {
    backend: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn root(State(state): State<AppState>, lang: Language) -> impl IntoResponse {
    let body = json!({
        "service": state.locales.message(lang, APOD_TITLE),
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "language": lang.code(),
        "storage": state.storage.backend_name(),
        "cache": state.cache.backend(),
        "translation": state.translator.provider_name(),
    });
    (StatusCode::OK, PrettyJson(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, PrettyJson(HealthResponse { status: "ok" }))
}

/// Storage must answer a ping. The cache is reported but never fails
/// readiness, since every cache error degrades to a miss.
pub async fn readyz(State(state): State<AppState>) -> Response {
    let deadline = Deadline::after(state.config.request_deadline());

    let storage_result = match deadline
        .bound(state.config.request_deadline(), state.storage.ping())
        .await
    {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err("storage ping timed out".to_string()),
    };
    let cache_result = state.cache.ping(deadline).await;

    let storage_ok = storage_result.is_ok();
    let body = ReadinessResponse {
        status: if storage_ok { "ready" } else { "unavailable" },
        storage: ComponentStatus {
            backend: state.storage.backend_name(),
            status: if storage_ok { "ok" } else { "error" },
            error: storage_result.err(),
        },
        cache: ComponentStatus {
            backend: state.cache.backend(),
            status: if cache_result.is_ok() { "ok" } else { "degraded" },
            error: cache_result.err().map(|e| e.to_string()),
        },
        translation_cache: state.translator.cache().stats().into(),
    };

    if !storage_ok {
        tracing::warn!(backend = state.storage.backend_name(), "Readiness check failed");
    }
    let status = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, PrettyJson(body)).into_response()
}

/// Prometheus text exposition.
pub async fn metrics() -> Response {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
