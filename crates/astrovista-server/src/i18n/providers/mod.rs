//! Machine translation backends.

pub mod deepl;
pub mod google;
pub mod mock;

use async_trait::async_trait;

pub use deepl::DeepLProvider;
pub use google::GoogleTranslateProvider;
pub use mock::MockProvider;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Translation API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Translation API returned no translation")]
    EmptyResult,
}

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;

    fn name(&self) -> &'static str;

    /// Whether calls cost money, and so whether results are worth caching.
    fn is_billable(&self) -> bool {
        true
    }
}

/// Reads an error response body, capped to keep log lines short.
pub(crate) async fn status_error(response: reqwest::Response) -> TranslationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TranslationError::Status {
        status,
        body: body.chars().take(200).collect(),
    }
}
