use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use astrovista_core::{Apod, ApodDate};

use super::{cached_or_load, json_response, within_deadline};
use crate::cache::Deadline;
use crate::cache::keys::{
    DATE_TTL, LATEST_KEY, LATEST_TTL, RANGE_PREFIX, SEARCH_PREFIX, date_key,
};
use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::i18n::Language;
use crate::i18n::locales::APOD_NOT_FOUND;
use crate::response::PrettyJson;
use crate::server::AppState;

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// GET /apod
pub async fn get_latest(
    State(state): State<AppState>,
    lang: Language,
) -> Result<Response, ApiError> {
    let deadline = Deadline::after(state.config.request_deadline());
    let storage = state.storage.clone();

    let found = cached_or_load(&state, LATEST_KEY, LATEST_TTL, deadline, || async move {
        within_deadline(deadline, storage.latest()).await
    })
    .await?;

    let Some((apod, cache_status)) = found else {
        return Err(ApiError::not_found("Document not found"));
    };
    let apod = state.translator.translate_apod(apod, lang).await;
    Ok(json_response(apod, Some(cache_status), None))
}

/// GET /apod/{date}
pub async fn get_by_date(
    State(state): State<AppState>,
    Path(raw_date): Path<String>,
    lang: Language,
) -> Result<Response, ApiError> {
    let date: ApodDate = raw_date.parse().map_err(|e: astrovista_core::CoreError| {
        ApiError::bad_request("Invalid date format. Use YYYY-MM-DD.").with_details(e.to_string())
    })?;

    let deadline = Deadline::after(state.config.request_deadline());
    let storage = state.storage.clone();
    let found = cached_or_load(&state, &date_key(&date), DATE_TTL, deadline, || async move {
        within_deadline(deadline, storage.find_by_date(&date)).await
    })
    .await?;

    let Some((apod, cache_status)) = found else {
        return Err(
            ApiError::not_found(state.locales.message(lang, APOD_NOT_FOUND))
                .with_details(date.to_string()),
        );
    };
    let apod = state.translator.translate_apod(apod, lang).await;
    Ok(json_response(apod, Some(cache_status), None))
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: Option<Uuid>,
    pub date: ApodDate,
}

/// Checks `X-API-Token` against the configured internal token. No
/// configured token means no request is authorized.
pub(crate) fn authorize(headers: &HeaderMap, auth: &AuthConfig) -> Result<(), ApiError> {
    let provided = headers
        .get(API_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    match (provided, auth.internal_api_token.as_deref()) {
        (Some(provided), Some(expected)) if !expected.is_empty() && provided == expected => Ok(()),
        _ => Err(ApiError::unauthorized(
            "Unauthorized - Valid API token required",
        )),
    }
}

/// POST /apod
///
/// Fetches today's APOD from NASA and stores it. On success the cached
/// latest entry and the entry for that date are dropped, along with cached
/// ranges and searches that could now be incomplete.
pub async fn create_apod(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&headers, &state.config.auth)?;

    let apod = state.nasa.fetch_apod(None).await?;
    let date = apod.date;

    let deadline = Deadline::after(state.config.request_deadline());
    let inserted: Apod = within_deadline(deadline, state.storage.insert(apod)).await?;
    tracing::info!(date = %date, id = ?inserted.id, "APOD added");

    // Invalidation gets its own budget; the insert may have used most of it.
    let deadline = Deadline::after(state.config.request_deadline());
    state.cache.delete(LATEST_KEY, deadline).await;
    state.cache.delete(&date_key(&date), deadline).await;
    state.cache.delete_prefix(RANGE_PREFIX, deadline).await;
    state.cache.delete_prefix(SEARCH_PREFIX, deadline).await;

    Ok((
        StatusCode::CREATED,
        PrettyJson(CreatedResponse {
            message: "APOD successfully added to database",
            id: inserted.id,
            date,
        }),
    )
        .into_response())
}
