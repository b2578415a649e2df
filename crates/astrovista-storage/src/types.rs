//! Query and result types used by the storage traits.

use astrovista_core::{Apod, ApodDate};
use serde::{Deserialize, Serialize};

/// Default page size for searches.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a search may request.
pub const MAX_PER_PAGE: u32 = 200;

/// Inclusive date interval. An open start means "from the first record".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<ApodDate>,
    pub end: ApodDate,
}

impl DateRange {
    #[must_use]
    pub fn new(start: Option<ApodDate>, end: ApodDate) -> Self {
        Self { start, end }
    }

    /// Whether `date` lies within the range.
    #[must_use]
    pub fn contains(&self, date: &ApodDate) -> bool {
        self.start.is_none_or(|start| *date >= start) && *date <= self.end
    }
}

/// Sort direction for search results, by date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses `asc`/`desc`; anything else is `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Media type restriction for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTypeFilter {
    Image,
    Video,
}

impl MediaTypeFilter {
    /// Parses `image`/`video`. `any` and unknown values mean no filter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    #[must_use]
    pub fn matches(&self, media_type: &str) -> bool {
        media_type == self.as_str()
    }
}

/// Parameters of a paginated search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub media_type: Option<MediaTypeFilter>,
    /// Case-insensitive substring matched against title and explanation.
    pub text: Option<String>,
    pub start: Option<ApodDate>,
    pub end: Option<ApodDate>,
    pub sort: SortOrder,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            media_type: None,
            text: None,
            start: None,
            end: None,
            sort: SortOrder::default(),
        }
    }
}

impl SearchQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaTypeFilter) -> Self {
        self.media_type = Some(media_type);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    #[must_use]
    pub fn with_dates(mut self, start: Option<ApodDate>, end: Option<ApodDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Number of records to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Whether a record satisfies every filter of this query.
    #[must_use]
    pub fn matches(&self, apod: &Apod) -> bool {
        if let Some(media_type) = &self.media_type
            && !media_type.matches(&apod.media_type)
        {
            return false;
        }
        if let Some(start) = &self.start
            && apod.date < *start
        {
            return false;
        }
        if let Some(end) = &self.end
            && apod.date > *end
        {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            return apod.title.to_lowercase().contains(&needle)
                || apod.explanation.to_lowercase().contains(&needle);
        }
        true
    }
}

/// One page of search results plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub total: u64,
    pub items: Vec<Apod>,
}

impl SearchPage {
    #[must_use]
    pub fn new(total: u64, items: Vec<Apod>) -> Self {
        Self { total, items }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
