use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use super::apod::authorize;
use crate::cache::Deadline;
use crate::error::ApiError;
use crate::server::AppState;

/// DELETE /cache
///
/// Drops every cached response and translation under the configured key
/// prefix. Clearing an empty or disabled cache still succeeds.
pub async fn clear_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&headers, &state.config.auth)?;

    let deadline = Deadline::after(state.config.request_deadline());
    state.cache.clear(deadline).await;
    state.translator.cache().local().clear();
    tracing::info!(backend = state.cache.backend(), "Cache cleared on request");

    Ok(StatusCode::NO_CONTENT)
}
