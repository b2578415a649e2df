use thiserror::Error;

/// Errors raised inside the cache layer.
///
/// Only [`CacheError::InvalidTtl`] ever reaches callers of
/// [`ExternalCache`](super::ExternalCache); everything else is logged and
/// absorbed at the cache boundary.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis pool configuration error: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("Invalid Redis URL: {0}")]
    InvalidUrl(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cache TTL must be greater than zero")]
    InvalidTtl,
}

impl CacheError {
    /// Whether the error is a caller mistake rather than a store failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidTtl)
    }
}

impl From<tokio::time::error::Elapsed> for CacheError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}
