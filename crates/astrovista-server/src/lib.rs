pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod metrics;
pub mod middleware;
pub mod nasa;
pub mod observability;
pub mod rate_limit;
pub mod response;
pub mod server;

pub use cache::{BoundedLocalCache, ExternalCache};
pub use config::{AppConfig, CacheConfig, RateLimitConfig, RedisConfig, ServerConfig};
pub use error::ApiError;
pub use i18n::{Language, TwoTierTranslationCache, Translator};
pub use observability::init_tracing;
pub use rate_limit::RateLimiter;
pub use server::{AppState, AstrovistaServer, ServerBuilder, build_app};
