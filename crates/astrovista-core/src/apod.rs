use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::ApodDate;

/// A single Astronomy Picture of the Day record.
///
/// The field names follow the NASA APOD API so that upstream payloads decode
/// directly; `_id` is assigned by storage on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apod {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub date: ApodDate,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hdurl: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub service_version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl Apod {
    /// Builds a minimal record; mostly useful for fixtures.
    pub fn new(date: ApodDate, title: impl Into<String>) -> Self {
        Self {
            id: None,
            date,
            explanation: String::new(),
            hdurl: String::new(),
            media_type: "image".to_string(),
            service_version: "v1".to_string(),
            title: title.into(),
            url: String::new(),
            copyright: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }
}

/// Response body for endpoints returning several APODs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApodList {
    pub count: usize,
    pub apods: Vec<Apod>,
}

impl From<Vec<Apod>> for ApodList {
    fn from(apods: Vec<Apod>) -> Self {
        Self {
            count: apods.len(),
            apods,
        }
    }
}

/// Response body for the paginated search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_results: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub results: Vec<Apod>,
}

impl SearchResponse {
    pub fn new(total_results: u64, page: u32, per_page: u32, results: Vec<Apod>) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total_results.div_ceil(u64::from(per_page))
        };
        Self {
            total_results,
            page,
            per_page,
            total_pages,
            results,
        }
    }
}

/// A language the API can respond in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    #[serde(rename = "nativeName")]
    pub native_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_nasa_payload() {
        let payload = serde_json::json!({
            "date": "2023-01-15",
            "explanation": "A beautiful nebula",
            "hdurl": "https://apod.nasa.gov/apod/image/2301/M31_hd.jpg",
            "media_type": "image",
            "service_version": "v1",
            "title": "Andromeda Galaxy",
            "url": "https://apod.nasa.gov/apod/image/2301/M31.jpg",
            "copyright": "Jane Doe"
        });
        let apod: Apod = serde_json::from_value(payload).unwrap();
        assert_eq!(apod.id, None);
        assert_eq!(apod.date.to_string(), "2023-01-15");
        assert_eq!(apod.copyright.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_video_without_hdurl_decodes() {
        let payload = serde_json::json!({
            "date": "2023-02-01",
            "media_type": "video",
            "title": "Solar Eclipse",
            "url": "https://www.youtube.com/embed/xyz"
        });
        let apod: Apod = serde_json::from_value(payload).unwrap();
        assert!(apod.hdurl.is_empty());
        assert_eq!(apod.media_type, "video");
    }

    #[test]
    fn test_id_serialized_as_underscore_id() {
        let mut apod = Apod::new("2023-01-15".parse().unwrap(), "Title");
        let id = Uuid::new_v4();
        apod.id = Some(id);
        let json = serde_json::to_value(&apod).unwrap();
        assert_eq!(json["_id"], id.to_string());
        assert!(json.get("copyright").is_none());
    }

    #[test]
    fn test_search_response_total_pages() {
        assert_eq!(SearchResponse::new(42, 1, 20, vec![]).total_pages, 3);
        assert_eq!(SearchResponse::new(40, 1, 20, vec![]).total_pages, 2);
        assert_eq!(SearchResponse::new(0, 1, 20, vec![]).total_pages, 0);
    }

    #[test]
    fn test_language_info_native_name_key() {
        let info = LanguageInfo {
            code: "fr".into(),
            name: "French".into(),
            native_name: "Français".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["nativeName"], "Français");
    }
}
