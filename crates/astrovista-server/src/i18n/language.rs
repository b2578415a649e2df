//! Response language negotiation.

use std::convert::Infallible;
use std::fmt;

use astrovista_core::LanguageInfo;
use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;

pub const DEFAULT_LANGUAGE: &str = "en";

/// `(code, English name, native name)` for every language the API serves.
pub const SUPPORTED_LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "English", "English"),
    ("pt-BR", "Brazilian Portuguese", "Português do Brasil"),
    ("es", "Spanish", "Español"),
    ("fr", "French", "Français"),
    ("de", "German", "Deutsch"),
    ("it", "Italian", "Italiano"),
];

pub fn supported_languages() -> Vec<LanguageInfo> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name, native_name)| LanguageInfo {
            code: (*code).to_string(),
            name: (*name).to_string(),
            native_name: (*native_name).to_string(),
        })
        .collect()
}

/// The negotiated response language, always one of [`SUPPORTED_LANGUAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language(&'static str);

impl Language {
    pub fn english() -> Self {
        Self(DEFAULT_LANGUAGE)
    }

    /// Maps a raw tag to a supported language. A tag matches a supported
    /// code it starts with (case-insensitive), so `fr-CA` is `fr`; anything
    /// unmatched is English.
    pub fn negotiate(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        SUPPORTED_LANGUAGES
            .iter()
            .map(|(code, _, _)| *code)
            .find(|code| !tag.is_empty() && tag.starts_with(&code.to_ascii_lowercase()))
            .map_or_else(Self::english, Self)
    }

    /// Picks the language from `?lang=` if present, else the first
    /// `Accept-Language` entry with its q-factor stripped.
    pub fn detect(query_lang: Option<&str>, accept_language: Option<&str>) -> Self {
        let raw = query_lang
            .filter(|lang| !lang.trim().is_empty())
            .or(accept_language)
            .unwrap_or(DEFAULT_LANGUAGE);
        let first = raw.split(',').next().unwrap_or_default();
        let tag = first.split(';').next().unwrap_or_default();
        Self::negotiate(tag)
    }

    pub fn code(&self) -> &'static str {
        self.0
    }

    pub fn is_english(&self) -> bool {
        self.0 == DEFAULT_LANGUAGE
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

fn query_lang(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "lang")
        .map(|(_, value)| value.into_owned())
}

impl<S> FromRequestParts<S> for Language
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_query = query_lang(parts.uri.query());
        let accept = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Self::detect(from_query.as_deref(), accept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_negotiate() {
        assert_eq!(Language::negotiate("pt-BR").code(), "pt-BR");
        assert_eq!(Language::negotiate("pt-br").code(), "pt-BR");
        assert_eq!(Language::negotiate("fr-CA").code(), "fr");
        assert_eq!(Language::negotiate("pt-PT").code(), "en");
        assert_eq!(Language::negotiate("ja").code(), "en");
        assert_eq!(Language::negotiate("").code(), "en");
    }

    #[test]
    fn test_detect_prefers_query() {
        let lang = Language::detect(Some("es"), Some("fr-FR,fr;q=0.9"));
        assert_eq!(lang.code(), "es");
    }

    #[test]
    fn test_detect_accept_language_first_entry() {
        assert_eq!(Language::detect(None, Some("de;q=0.8, fr")).code(), "de");
        assert_eq!(Language::detect(None, Some("fr-FR,fr;q=0.9")).code(), "fr");
        assert_eq!(Language::detect(Some(""), Some("it")).code(), "it");
        assert!(Language::detect(None, None).is_english());
    }

    #[tokio::test]
    async fn test_extractor_reads_query_and_header() {
        let (mut parts, _) = Request::builder()
            .uri("/apod?lang=pt-BR&x=1")
            .header(ACCEPT_LANGUAGE, "fr")
            .body(())
            .unwrap()
            .into_parts();
        let lang = Language::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(lang.code(), "pt-BR");

        let (mut parts, _) = Request::builder()
            .uri("/apod")
            .header(ACCEPT_LANGUAGE, "fr")
            .body(())
            .unwrap()
            .into_parts();
        let lang = Language::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(lang.code(), "fr");
    }

    #[test]
    fn test_supported_languages_listing() {
        let languages = supported_languages();
        assert_eq!(languages.len(), 6);
        assert_eq!(languages[1].native_name, "Português do Brasil");
    }
}
