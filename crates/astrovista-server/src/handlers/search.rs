use axum::extract::{RawQuery, State};
use axum::response::Response;

use astrovista_core::{ApodDate, SearchResponse};
use astrovista_storage::{DEFAULT_PER_PAGE, MAX_PER_PAGE, MediaTypeFilter, SearchQuery, SortOrder};

use super::{cached_or_load, first_query_values, json_response, within_deadline};
use crate::cache::Deadline;
use crate::cache::keys::{SEARCH_TTL, search_key};
use crate::error::ApiError;
use crate::i18n::Language;
use crate::i18n::locales::SEARCH_NO_RESULTS;
use crate::server::AppState;

/// Raw search parameters. Every field is a string so that invalid values
/// fall back to defaults instead of rejecting the request.
#[derive(Debug, Default)]
pub struct SearchParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub media_type: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &Option<String>, field: &str) -> Option<ApodDate> {
    let raw = non_empty(value)?;
    match raw.parse() {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::debug!(field, value = raw, "Invalid date ignored");
            None
        }
    }
}

impl SearchParams {
    /// Repeated keys resolve to their first occurrence.
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut values = first_query_values(raw);
        Self {
            page: values.remove("page"),
            per_page: values.remove("perPage"),
            media_type: values.remove("mediaType"),
            search: values.remove("search"),
            start_date: values.remove("startDate"),
            end_date: values.remove("endDate"),
            sort: values.remove("sort"),
        }
    }

    pub fn to_query(&self) -> SearchQuery {
        let page = non_empty(&self.page)
            .and_then(|p| p.parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .map_or(1, |p| u32::try_from(p).unwrap_or(u32::MAX));

        let per_page = non_empty(&self.per_page)
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| (1..=MAX_PER_PAGE).contains(p))
            .unwrap_or(DEFAULT_PER_PAGE);

        let mut query = SearchQuery::new()
            .with_page(page)
            .with_per_page(per_page)
            .with_dates(
                parse_date(&self.start_date, "startDate"),
                parse_date(&self.end_date, "endDate"),
            )
            .with_sort(
                non_empty(&self.sort)
                    .and_then(SortOrder::parse)
                    .unwrap_or_default(),
            );

        if let Some(media_type) = non_empty(&self.media_type).and_then(MediaTypeFilter::parse) {
            query = query.with_media_type(media_type);
        }
        if let Some(text) = non_empty(&self.search) {
            query = query.with_text(text);
        }
        query
    }
}

/// GET /apods/search
pub async fn search(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    lang: Language,
) -> Result<Response, ApiError> {
    let query = SearchParams::from_query(raw_query.as_deref()).to_query();
    let key = search_key(raw_query.as_deref().unwrap_or_default());

    let deadline = Deadline::after(state.config.request_deadline());
    let storage = state.storage.clone();
    let found = cached_or_load(&state, &key, SEARCH_TTL, deadline, || async move {
        let page = within_deadline(deadline, storage.search(&query)).await?;
        if page.is_empty() && query.page == 1 {
            return Ok::<_, ApiError>(None);
        }
        Ok::<_, ApiError>(Some(SearchResponse::new(
            page.total,
            query.page,
            query.per_page,
            page.items,
        )))
    })
    .await?;

    let Some((mut response, cache_status)) = found else {
        return Err(ApiError::not_found(
            state.locales.message(lang, SEARCH_NO_RESULTS),
        ));
    };

    response.results = state.translator.translate_apods(response.results, lang).await;
    Ok(json_response(response, Some(cache_status), None))
}
