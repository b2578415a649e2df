//! Route handlers.
//!
//! Read handlers share one shape: look the untranslated payload up in the
//! external cache, fall back to storage on a miss and write the result back,
//! then translate per request.

pub mod apod;
pub mod apods;
pub mod cache;
pub mod health;
pub mod languages;
pub mod search;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use astrovista_storage::StorageError;

use crate::cache::Deadline;
use crate::error::ApiError;
use crate::response::{CacheStatus, PrettyJson, SIZE, X_CACHE};
use crate::server::AppState;

pub use health::{healthz, metrics, readyz, root};

/// Decodes a query string, keeping the first value of each repeated key.
pub(crate) fn first_query_values(raw: Option<&str>) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        values
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    values
}

/// Runs a storage call within what is left of the request deadline.
pub(crate) async fn within_deadline<T>(
    deadline: Deadline,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, ApiError> {
    match deadline.bound(Duration::MAX, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::Unavailable("Storage query timed out".into())),
    }
}

/// Fetches `key` from the external cache, or loads it with `load` and caches
/// the result for `ttl`. `load` returning `None` is not cached.
pub(crate) async fn cached_or_load<T, F, Fut>(
    state: &AppState,
    key: &str,
    ttl: Duration,
    deadline: Deadline,
    load: F,
) -> Result<Option<(T, CacheStatus)>, ApiError>
where
    T: Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    if let Some(hit) = state.cache.get::<T>(key, deadline).await {
        return Ok(Some((hit, CacheStatus::Hit)));
    }

    let Some(value) = load().await? else {
        return Ok(None);
    };
    if let Err(e) = state.cache.set(key, &value, ttl, deadline).await {
        tracing::warn!(key = %key, error = %e, "Response not cached");
    }
    Ok(Some((value, CacheStatus::Miss)))
}

/// Pretty JSON body with `X-Cache` and, for list payloads, `Size`.
pub(crate) fn json_response<T: Serialize>(
    body: T,
    cache_status: Option<CacheStatus>,
    size: Option<usize>,
) -> Response {
    let mut response = PrettyJson(body).into_response();
    let headers = response.headers_mut();
    if let Some(status) = cache_status {
        headers.insert(X_CACHE, status.header_value());
    }
    if let Some(size) = size
        && let Ok(value) = HeaderValue::from_str(&size.to_string())
    {
        headers.insert(SIZE, value);
    }
    response
}
