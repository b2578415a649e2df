//! Two-tier cache of translation results.
//!
//! Tier 1 is an in-process [`BoundedLocalCache`]; tier 2 is the shared
//! [`ExternalCache`], switched on with [`TwoTierTranslationCache::enable_tier2`]
//! once Redis is known to be live.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cache::keys::{TRANSLATION_PREFIX, sha256_hex};
use crate::cache::{BoundedLocalCache, CacheStats, Deadline, ExternalCache};

/// Identity of one translation: languages plus a SHA-256 digest of the
/// source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    source: String,
    target: String,
    digest: String,
}

impl TranslationKey {
    pub fn new(source: &str, target: &str, content: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            digest: sha256_hex(content),
        }
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TRANSLATION_PREFIX}{}:{}:{}",
            self.source, self.target, self.digest
        )
    }
}

#[derive(Debug)]
pub struct TwoTierTranslationCache {
    local: BoundedLocalCache,
    external: ExternalCache,
    tier2_enabled: AtomicBool,
    tier2_ttl: Duration,
    tier2_budget: Duration,
}

impl TwoTierTranslationCache {
    pub fn new(
        local: BoundedLocalCache,
        external: ExternalCache,
        tier2_ttl: Duration,
        tier2_budget: Duration,
    ) -> Self {
        Self {
            local,
            external,
            tier2_enabled: AtomicBool::new(false),
            tier2_ttl,
            tier2_budget,
        }
    }

    /// A cache with tier 1 only.
    pub fn local_only(local: BoundedLocalCache) -> Self {
        Self::new(
            local,
            ExternalCache::disabled(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
    }

    /// Turns on tier 2. Does nothing when the external cache is disabled.
    /// Returns whether tier 2 is on afterwards.
    pub fn enable_tier2(&self) -> bool {
        if !self.external.is_enabled() {
            tracing::debug!("External cache disabled, translation cache stays local");
            return false;
        }
        if !self.tier2_enabled.swap(true, Ordering::AcqRel) {
            tracing::info!("Translation cache tier 2 enabled");
        }
        true
    }

    pub fn is_tier2_enabled(&self) -> bool {
        self.tier2_enabled.load(Ordering::Acquire)
    }

    /// Tier 2 first when enabled; a tier-2 hit is copied into tier 1.
    pub async fn get(&self, key: &TranslationKey) -> Option<String> {
        let key_str = key.to_string();

        if self.is_tier2_enabled() {
            let deadline = Deadline::after(self.tier2_budget);
            if let Some(value) = self.external.get::<String>(&key_str, deadline).await {
                self.local.set(key_str, value.clone());
                crate::metrics::record_cache_hit("translation_l2");
                return Some(value);
            }
        }

        let value = self.local.get(&key_str);
        if value.is_some() {
            crate::metrics::record_cache_hit("translation_l1");
        } else {
            crate::metrics::record_cache_miss("translation");
        }
        value
    }

    /// Writes tier 1, and tier 2 when enabled.
    pub async fn set(&self, key: &TranslationKey, value: &str) {
        let key_str = key.to_string();
        self.local.set(key_str.clone(), value);

        if self.is_tier2_enabled() {
            let deadline = Deadline::after(self.tier2_budget);
            if let Err(e) = self
                .external
                .set(&key_str, value, self.tier2_ttl, deadline)
                .await
            {
                tracing::warn!(key = %key_str, error = %e, "Translation tier 2 write rejected");
            }
        }
    }

    pub fn local(&self) -> &BoundedLocalCache {
        &self.local
    }

    pub fn stats(&self) -> CacheStats {
        self.local.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::Arc;

    fn external() -> ExternalCache {
        ExternalCache::with_store(Arc::new(MemoryStore::new()), Duration::from_secs(1))
    }

    fn two_tier(local_ttl: Duration, external: ExternalCache) -> TwoTierTranslationCache {
        TwoTierTranslationCache::new(
            BoundedLocalCache::new(100, local_ttl),
            external,
            Duration::from_secs(30 * 24 * 3600),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_key_format_uses_full_digest() {
        let key = TranslationKey::new("en", "fr", "");
        assert_eq!(
            key.to_string(),
            "translation:en:fr:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(key.digest().len(), 64);
    }

    #[test]
    fn test_same_prefix_suffix_different_keys() {
        let a = TranslationKey::new("en", "es", "abcdefghijklmnop-one-zyxwvutsrqponmlk");
        let b = TranslationKey::new("en", "es", "abcdefghijklmnop-two-zyxwvutsrqponmlk");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_enable_tier2_noop_when_external_disabled() {
        let cache = two_tier(Duration::from_secs(60), ExternalCache::disabled());
        assert!(!cache.enable_tier2());
        assert!(!cache.is_tier2_enabled());

        let key = TranslationKey::new("en", "fr", "Galaxy");
        cache.set(&key, "Galaxie").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("Galaxie"));
    }

    #[tokio::test]
    async fn test_enable_tier2_idempotent() {
        let cache = two_tier(Duration::from_secs(60), external());
        assert!(cache.enable_tier2());
        assert!(cache.enable_tier2());
        assert!(cache.is_tier2_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier2_fresh_wins_over_stale_tier1() {
        let shared = external();
        let cache = two_tier(Duration::from_secs(10), shared.clone());
        cache.enable_tier2();

        let key = TranslationKey::new("en", "fr", "Nebula");
        cache.set(&key, "Nébuleuse").await;
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.local().get(&key.to_string()), None);

        assert_eq!(cache.get(&key).await.as_deref(), Some("Nébuleuse"));
        assert_eq!(
            cache.local().get(&key.to_string()).as_deref(),
            Some("Nébuleuse")
        );
    }

    #[tokio::test]
    async fn test_tier2_shared_between_instances() {
        let shared = external();
        let writer = two_tier(Duration::from_secs(60), shared.clone());
        let reader = two_tier(Duration::from_secs(60), shared);
        writer.enable_tier2();
        reader.enable_tier2();

        let key = TranslationKey::new("en", "de", "Comet");
        writer.set(&key, "Komet").await;
        assert_eq!(reader.get(&key).await.as_deref(), Some("Komet"));
    }

    #[tokio::test]
    async fn test_tier2_miss_falls_back_to_tier1() {
        let cache = two_tier(Duration::from_secs(60), external());
        let key = TranslationKey::new("en", "it", "Moon");
        cache.set(&key, "Luna").await;

        cache.enable_tier2();
        assert_eq!(cache.get(&key).await.as_deref(), Some("Luna"));
    }
}
