use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{TranslationError, TranslationProvider, status_error};

pub const DEEPL_BASE_URL: &str = "https://api.deepl.com";
pub const DEEPL_FREE_BASE_URL: &str = "https://api-free.deepl.com";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// DeepL v2 client. Free-plan keys (suffix `:fx`) use the free endpoint
/// unless a base URL is given explicitly.
#[derive(Debug, Clone)]
pub struct DeepLProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DeepLProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let api_key = api_key.into();
        let base_url = base_url.unwrap_or_else(|| default_base_url(&api_key).to_string());
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn default_base_url(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        DEEPL_FREE_BASE_URL
    } else {
        DEEPL_BASE_URL
    }
}

/// DeepL language codes are upper case, region included (`PT-BR`).
fn deepl_language_code(lang: &str) -> String {
    lang.to_ascii_uppercase()
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let source_lang = (!source.is_empty()).then(|| {
            deepl_language_code(source.split('-').next().unwrap_or_default())
        });
        let body = TranslateRequest {
            text: [text],
            source_lang,
            target_lang: deepl_language_code(target),
        };

        let response = self
            .client
            .post(format!("{}/v2/translate", self.base_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: TranslateResponse = response.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslationError::EmptyResult)
    }

    fn name(&self) -> &'static str {
        "deepl"
    }
}
