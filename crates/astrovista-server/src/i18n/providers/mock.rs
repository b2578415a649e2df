use async_trait::async_trait;

use super::{TranslationError, TranslationProvider};

const MAX_MOCK_CHARS: usize = 100;

/// Marks text with the target language instead of translating it. Used when
/// no translation API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProvider;

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate(
        &self,
        text: &str,
        _source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        if text.chars().count() > MAX_MOCK_CHARS {
            let head: String = text.chars().take(MAX_MOCK_CHARS).collect();
            return Ok(format!("{head}... [Translated to {target}]"));
        }
        Ok(format!("{text} [{target}]"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_billable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_text_is_tagged() {
        let out = MockProvider.translate("Galaxy", "en", "fr").await.unwrap();
        assert_eq!(out, "Galaxy [fr]");
    }

    #[tokio::test]
    async fn test_long_text_is_truncated() {
        let text = "x".repeat(150);
        let out = MockProvider.translate(&text, "en", "es").await.unwrap();
        assert_eq!(out, format!("{}... [Translated to es]", "x".repeat(100)));
    }

    #[tokio::test]
    async fn test_exactly_limit_is_not_truncated() {
        let text = "é".repeat(100);
        let out = MockProvider.translate(&text, "en", "de").await.unwrap();
        assert_eq!(out, format!("{text} [de]"));
        assert!(!MockProvider.is_billable());
    }
}
