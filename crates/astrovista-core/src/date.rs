use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const APOD_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// The publication date of an APOD, always rendered as `YYYY-MM-DD`.
///
/// Ordering follows the calendar, which also matches the lexical order of the
/// rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApodDate(pub Date);

impl ApodDate {
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn inner(&self) -> &Date {
        &self.0
    }

    pub fn into_inner(self) -> Date {
        self.0
    }
}

/// Today's date in UTC.
pub fn today_utc() -> ApodDate {
    ApodDate(OffsetDateTime::now_utc().date())
}

impl fmt::Display for ApodDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(APOD_DATE_FORMAT).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for ApodDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Date::parse(s.trim(), APOD_DATE_FORMAT)
            .map(ApodDate)
            .map_err(|_| CoreError::invalid_date(s))
    }
}

impl Serialize for ApodDate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApodDate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApodDate::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn test_parse_and_display() {
        let date: ApodDate = "2023-01-15".parse().unwrap();
        assert_eq!(
            date.into_inner(),
            Date::from_calendar_date(2023, Month::January, 15).unwrap()
        );
        assert_eq!(date.to_string(), "2023-01-15");
    }

    #[test]
    fn test_rejects_malformed_dates() {
        assert!("2023-1-15".parse::<ApodDate>().is_err());
        assert!("2023-02-30".parse::<ApodDate>().is_err());
        assert!("15/01/2023".parse::<ApodDate>().is_err());
        assert!("".parse::<ApodDate>().is_err());
    }

    #[test]
    fn test_ordering_matches_calendar() {
        let a: ApodDate = "1995-06-16".parse().unwrap();
        let b: ApodDate = "2023-01-15".parse().unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_serde_as_string() {
        let date: ApodDate = "2024-03-08".parse().unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-03-08\"");

        let back: ApodDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);

        assert!(serde_json::from_str::<ApodDate>("\"not-a-date\"").is_err());
    }
}
