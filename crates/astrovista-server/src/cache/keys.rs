//! Cache key builders and TTLs for cached API responses.

use std::time::Duration;

use astrovista_core::ApodDate;
use sha2::{Digest, Sha256};

pub const LATEST_KEY: &str = "latest";
pub const DATE_PREFIX: &str = "date:";
pub const RANGE_PREFIX: &str = "range:";
pub const SEARCH_PREFIX: &str = "search:";
pub const TRANSLATION_PREFIX: &str = "translation:";

pub const LATEST_TTL: Duration = Duration::from_secs(60 * 60);
pub const DATE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const RANGE_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const SEARCH_TTL: Duration = Duration::from_secs(5 * 60);

pub fn date_key(date: &ApodDate) -> String {
    format!("{DATE_PREFIX}{date}")
}

pub fn range_key(start: Option<&ApodDate>, end: &ApodDate) -> String {
    match start {
        Some(start) => format!("{RANGE_PREFIX}{start}:{end}"),
        None => format!("{RANGE_PREFIX}:{end}"),
    }
}

/// Search results are keyed by a digest of the raw query string, so two
/// spellings of the same query are cached separately.
pub fn search_key(raw_query: &str) -> String {
    format!("{SEARCH_PREFIX}{}", sha256_hex(raw_query))
}

pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let d: ApodDate = "2023-01-15".parse().unwrap();
        let e: ApodDate = "2023-01-20".parse().unwrap();
        assert_eq!(date_key(&d), "date:2023-01-15");
        assert_eq!(range_key(Some(&d), &e), "range:2023-01-15:2023-01-20");
        assert_eq!(range_key(None, &e), "range::2023-01-20");
    }

    #[test]
    fn test_search_key_is_sha256() {
        assert_eq!(
            search_key(""),
            "search:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(search_key("page=1"), search_key("page=2"));
    }
}
