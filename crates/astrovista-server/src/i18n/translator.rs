//! Translation of APOD text into the negotiated response language.

use std::sync::Arc;
use std::time::Duration;

use astrovista_core::Apod;
use futures_util::future::join_all;
use tokio::task::JoinHandle;

use super::language::{DEFAULT_LANGUAGE, Language};
use super::providers::{
    DeepLProvider, GoogleTranslateProvider, MockProvider, TranslationError, TranslationProvider,
};
use super::providers::google::GOOGLE_TRANSLATE_BASE_URL;
use super::translation_cache::{TranslationKey, TwoTierTranslationCache};
use crate::cache::{BoundedLocalCache, ExternalCache};
use crate::config::{CacheConfig, TranslationConfig, TranslationProviderKind};

#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn TranslationProvider>,
    cache: Arc<TwoTierTranslationCache>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Translator {
    pub fn new(provider: Arc<dyn TranslationProvider>, cache: Arc<TwoTierTranslationCache>) -> Self {
        Self { provider, cache }
    }

    /// A translator over [`MockProvider`] with a default tier-1 cache.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(MockProvider),
            Arc::new(TwoTierTranslationCache::local_only(
                BoundedLocalCache::default(),
            )),
        )
    }

    /// Builds the provider named by `config` and a two-tier cache over
    /// `external`. Tier 2 is enabled when `external` is live.
    pub fn from_config(
        config: &TranslationConfig,
        cache_config: &CacheConfig,
        external: ExternalCache,
    ) -> Result<Self, TranslationError> {
        let provider = select_provider(config)?;
        tracing::info!(provider = provider.name(), "Translation provider selected");

        let local = BoundedLocalCache::new(cache_config.local_capacity, cache_config.local_ttl());
        let cache = TwoTierTranslationCache::new(
            local,
            external,
            cache_config.translation_ttl(),
            Duration::from_millis(cache_config.request_deadline_ms),
        );
        cache.enable_tier2();

        Ok(Self::new(provider, Arc::new(cache)))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn cache(&self) -> &TwoTierTranslationCache {
        &self.cache
    }

    /// Periodically drops expired tier 1 entries so they stop counting
    /// toward capacity.
    pub fn spawn_cache_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.local().cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired translations");
                }
            }
        })
    }

    /// Translates English `text` into `target`. English targets and blank
    /// text are returned unchanged without calling the provider.
    pub async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        if target.is_english() || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let cacheable = self.provider.is_billable();
        let key = TranslationKey::new(DEFAULT_LANGUAGE, target.code(), text);
        if cacheable && let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let result = self
            .provider
            .translate(text, DEFAULT_LANGUAGE, target.code())
            .await;
        crate::metrics::record_translation_request(self.provider.name(), result.is_ok());
        let translated = result?;

        if cacheable {
            self.cache.set(&key, &translated).await;
        }
        Ok(translated)
    }

    /// Like [`Translator::translate`] but falls back to the original text.
    pub async fn try_translate(&self, text: &str, target: Language) -> String {
        match self.translate(text, target).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    target = %target,
                    error = %e,
                    "Translation failed, serving original text"
                );
                text.to_string()
            }
        }
    }

    /// Translates title, explanation and copyright.
    pub async fn translate_apod(&self, mut apod: Apod, target: Language) -> Apod {
        if target.is_english() {
            return apod;
        }

        let (title, explanation, copyright) = tokio::join!(
            self.try_translate(&apod.title, target),
            self.try_translate(&apod.explanation, target),
            async {
                match apod.copyright.as_deref() {
                    Some(c) => Some(self.try_translate(c, target).await),
                    None => None,
                }
            },
        );
        apod.title = title;
        apod.explanation = explanation;
        apod.copyright = copyright;
        apod
    }

    pub async fn translate_apods(&self, apods: Vec<Apod>, target: Language) -> Vec<Apod> {
        if target.is_english() {
            return apods;
        }
        join_all(apods.into_iter().map(|apod| self.translate_apod(apod, target))).await
    }
}

fn select_provider(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationProvider>, TranslationError> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let google_key = config.google_api_key.as_deref().filter(|k| !k.is_empty());
    let deepl_key = config.deepl_api_key.as_deref().filter(|k| !k.is_empty());

    let google = |key: &str| -> Result<Arc<dyn TranslationProvider>, TranslationError> {
        let base_url = config
            .google_base_url
            .clone()
            .unwrap_or_else(|| GOOGLE_TRANSLATE_BASE_URL.to_string());
        Ok(Arc::new(GoogleTranslateProvider::new(key, base_url, timeout)?))
    };
    let deepl = |key: &str| -> Result<Arc<dyn TranslationProvider>, TranslationError> {
        Ok(Arc::new(DeepLProvider::new(
            key,
            config.deepl_base_url.clone(),
            timeout,
        )?))
    };

    match (config.provider, google_key, deepl_key) {
        (TranslationProviderKind::Mock, _, _) => Ok(Arc::new(MockProvider)),
        (TranslationProviderKind::Google, Some(key), _) => google(key),
        (TranslationProviderKind::Deepl, _, Some(key)) => deepl(key),
        (TranslationProviderKind::Auto, Some(key), _) => google(key),
        (TranslationProviderKind::Auto, None, Some(key)) => deepl(key),
        (kind, _, _) => {
            if kind != TranslationProviderKind::Auto {
                tracing::warn!(provider = ?kind, "Translation API key missing, using mock provider");
            }
            Ok(Arc::new(MockProvider))
        }
    }
}
