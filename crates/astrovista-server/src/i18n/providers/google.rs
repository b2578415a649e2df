use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{TranslationError, TranslationProvider, status_error};

pub const GOOGLE_TRANSLATE_BASE_URL: &str = "https://translation.googleapis.com";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: [&'a str; 1],
    source: String,
    target: String,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Google Cloud Translation v2 client.
#[derive(Debug, Clone)]
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleTranslateProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Google expects bare primary subtags in lower case (`pt-BR` becomes `pt`).
fn google_language_code(lang: &str) -> String {
    lang.split('-').next().unwrap_or_default().to_ascii_lowercase()
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let body = TranslateRequest {
            q: [text],
            source: google_language_code(source),
            target: google_language_code(target),
            format: "text",
        };

        let response = self
            .client
            .post(format!("{}/language/translate/v2", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: TranslateResponse = response.json().await?;
        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or(TranslationError::EmptyResult)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
