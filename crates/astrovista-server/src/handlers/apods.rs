use axum::extract::{RawQuery, State};
use axum::response::Response;

use astrovista_core::{ApodDate, ApodList, today_utc};
use astrovista_storage::DateRange;

use super::{cached_or_load, first_query_values, json_response, within_deadline};
use crate::cache::Deadline;
use crate::cache::keys::{RANGE_TTL, range_key};
use crate::error::ApiError;
use crate::i18n::Language;
use crate::server::AppState;

/// GET /apods
pub async fn list_all(
    State(state): State<AppState>,
    lang: Language,
) -> Result<Response, ApiError> {
    let deadline = Deadline::after(state.config.request_deadline());
    let apods = within_deadline(deadline, state.storage.list_all()).await?;
    if apods.is_empty() {
        return Err(ApiError::not_found("No documents found!")
            .with_details("No APODs found in the database."));
    }

    let apods = state.translator.translate_apods(apods, lang).await;
    let size = apods.len();
    Ok(json_response(ApodList::from(apods), None, Some(size)))
}

#[derive(Debug, Default)]
pub struct DateRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRangeParams {
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut values = first_query_values(raw);
        Self {
            start: values.remove("start"),
            end: values.remove("end"),
        }
    }
}

fn parse_optional_date(raw: Option<&str>, which: &str) -> Result<Option<ApodDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e: astrovista_core::CoreError| {
            ApiError::bad_request(format!("Invalid {which} date format. Use YYYY-MM-DD."))
                .with_details(e.to_string())
        }),
    }
}

/// GET /apods/date-range?start=&end=
///
/// `end` defaults to today (UTC); without `start` the range is open.
pub async fn date_range(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    lang: Language,
) -> Result<Response, ApiError> {
    let params = DateRangeParams::from_query(raw_query.as_deref());
    let start = parse_optional_date(params.start.as_deref(), "start")?;
    let end = parse_optional_date(params.end.as_deref(), "end")?.unwrap_or_else(today_utc);
    let deadline = Deadline::after(state.config.request_deadline());
    let storage = state.storage.clone();
    let range = DateRange::new(start, end);
    let found = cached_or_load(
        &state,
        &range_key(start.as_ref(), &end),
        RANGE_TTL,
        deadline,
        || async move {
            let apods = within_deadline(deadline, storage.date_range(&range)).await?;
            Ok::<_, ApiError>((!apods.is_empty()).then(|| ApodList::from(apods)))
        },
    )
    .await?;

    let Some((list, cache_status)) = found else {
        return Err(
            ApiError::not_found("No documents found for the given date range.").with_details(
                format!(
                    "Start date: {}",
                    start.map(|d| d.to_string()).unwrap_or_default()
                ),
            ),
        );
    };

    let apods = state.translator.translate_apods(list.apods, lang).await;
    let size = apods.len();
    Ok(json_response(ApodList::from(apods), Some(cache_status), Some(size)))
}
