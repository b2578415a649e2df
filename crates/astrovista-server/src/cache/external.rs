//! Fail-open client over the shared key-value store.
//!
//! The connect/disable decision is made once, at startup. A disabled cache
//! answers every `get` with `None` and accepts every write as a no-op, so
//! callers never need to distinguish "cache unavailable" from "cache empty".

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::deadline::Deadline;
use super::error::CacheError;
use super::store::{KeyValueStore, RedisStore};
use crate::config::RedisConfig;

#[derive(Clone)]
pub struct ExternalCache {
    store: Option<Arc<dyn KeyValueStore>>,
    op_timeout: Duration,
}

impl std::fmt::Debug for ExternalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalCache")
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl ExternalCache {
    /// A cache that is permanently disabled.
    pub fn disabled() -> Self {
        Self {
            store: None,
            op_timeout: Duration::ZERO,
        }
    }

    /// A live cache over an already-connected store.
    pub fn with_store(store: Arc<dyn KeyValueStore>, op_timeout: Duration) -> Self {
        Self {
            store: Some(store),
            op_timeout,
        }
    }

    /// Connects to Redis with a single bounded probe.
    ///
    /// Any failure (pool creation, connection, PING, timeout) yields a
    /// disabled cache for the rest of the process lifetime.
    pub async fn connect(config: &RedisConfig) -> Self {
        if !config.enabled {
            tracing::info!("Redis disabled, response caching off");
            return Self::disabled();
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        match Self::probe(config, timeout).await {
            Ok(store) => {
                tracing::info!(url = %mask_url(&config.url), "Connected to Redis");
                Self::with_store(Arc::new(store), timeout)
            }
            Err(e) => {
                tracing::warn!(
                    url = %mask_url(&config.url),
                    error = %e,
                    "Could not connect to Redis, response caching disabled"
                );
                Self::disabled()
            }
        }
    }

    async fn probe(config: &RedisConfig, timeout: Duration) -> Result<RedisStore, CacheError> {
        let url = connection_url(config)?;
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        let store = RedisStore::new(pool, config.key_prefix.clone());
        tokio::time::timeout(timeout, store.ping()).await??;
        Ok(store)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Name of the backing store, or `"disabled"`.
    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |s| s.name())
    }

    /// Looks up and decodes `key`.
    ///
    /// Absent, malformed, unreachable and timed-out all read as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, deadline: Deadline) -> Option<T> {
        let store = self.store.as_ref()?;

        let raw = match deadline.bound(self.op_timeout, store.get(key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                crate::metrics::record_cache_miss("external");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Cache GET failed");
                crate::metrics::record_cache_miss("external");
                return None;
            }
            Err(_) => {
                tracing::warn!(key = %key, "Cache GET timed out");
                crate::metrics::record_cache_miss("external");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "cache hit");
                crate::metrics::record_cache_hit("external");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached payload could not be decoded");
                crate::metrics::record_cache_miss("external");
                None
            }
        }
    }

    /// Serializes `value` and stores it for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTtl`] for a zero TTL, whether or not the
    /// cache is enabled. Store failures are logged, never returned.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        deadline: Deadline,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl);
        }
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache value could not be serialized");
                return Ok(());
            }
        };

        match deadline
            .bound(self.op_timeout, store.set(key, payload, ttl))
            .await
        {
            Ok(Ok(())) => tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set"),
            Ok(Err(e)) => tracing::warn!(key = %key, error = %e, "Cache SET failed"),
            Err(_) => tracing::warn!(key = %key, "Cache SET timed out"),
        }
        Ok(())
    }

    pub async fn delete(&self, key: &str, deadline: Deadline) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match deadline.bound(self.op_timeout, store.delete(key)).await {
            Ok(Ok(())) => tracing::debug!(key = %key, "cache invalidated"),
            Ok(Err(e)) => tracing::warn!(key = %key, error = %e, "Cache DEL failed"),
            Err(_) => tracing::warn!(key = %key, "Cache DEL timed out"),
        }
    }

    /// Deletes every key under `prefix`.
    pub async fn delete_prefix(&self, prefix: &str, deadline: Deadline) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match deadline.bound(self.op_timeout, store.delete_prefix(prefix)).await {
            Ok(Ok(removed)) => tracing::debug!(prefix = %prefix, removed, "cache prefix invalidated"),
            Ok(Err(e)) => tracing::warn!(prefix = %prefix, error = %e, "Cache prefix delete failed"),
            Err(_) => tracing::warn!(prefix = %prefix, "Cache prefix delete timed out"),
        }
    }

    pub async fn clear(&self, deadline: Deadline) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match deadline.bound(self.op_timeout, store.clear()).await {
            Ok(Ok(())) => tracing::info!("cache cleared"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Cache clear failed"),
            Err(_) => tracing::warn!("Cache clear timed out"),
        }
    }

    /// Health probe for `/readyz`. A disabled cache is not an error.
    pub async fn ping(&self, deadline: Deadline) -> Result<(), CacheError> {
        match self.store.as_ref() {
            Some(store) => deadline.bound(self.op_timeout, store.ping()).await?,
            None => Ok(()),
        }
    }
}

/// Applies the configured password to the Redis URL when the URL carries none.
fn connection_url(config: &RedisConfig) -> Result<String, CacheError> {
    let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(config.url.clone());
    };
    let mut url =
        url::Url::parse(&config.url).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
    if url.password().is_none() {
        url.set_password(Some(password))
            .map_err(|_| CacheError::InvalidUrl(config.url.clone()))?;
    }
    Ok(url.to_string())
}

/// Masks the password in a Redis URL for logging.
fn mask_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("****"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
