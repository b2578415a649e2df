//! Key-value stores behind [`ExternalCache`](super::ExternalCache).

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::time::Instant;

use super::error::CacheError;

/// A shared string key-value store with per-entry TTLs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Deletes every key starting with `prefix` and returns how many were
    /// removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Removes every key owned by this store.
    async fn clear(&self) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// Redis store. Logical keys are namespaced with `key_prefix` so several
/// services can share one database.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    key_prefix: String,
}

impl RedisStore {
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
        }
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

/// Escapes glob metacharacters for use in a `KEYS` pattern.
fn glob_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value = conn.get::<_, Option<String>>(self.physical(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        conn.pset_ex::<_, _, ()>(self.physical(key), value, millis)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(self.physical(key)).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", glob_escape(&self.physical(prefix)));
        let keys = conn.keys::<_, Vec<String>>(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = conn.del::<_, u64>(&keys).await?;
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        if self.key_prefix.is_empty() {
            let mut conn = self.pool.get().await?;
            let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
            return Ok(());
        }
        self.delete_prefix("").await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// In-process store over a `DashMap`. Used when several components need a
/// shared store without a Redis server, mainly in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_escape() {
        assert_eq!(glob_escape("astrovista:range:"), "astrovista:range:");
        assert_eq!(glob_escape("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store
            .set("latest", "v".into(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get("latest").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("latest").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_delete_prefix() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        for key in ["range:a:b", "range:c:d", "date:2023-01-15"] {
            store.set(key, "x".into(), ttl).await.unwrap();
        }

        assert_eq!(store.delete_prefix("range:").await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("date:2023-01-15").await.unwrap().is_some());
    }
}
