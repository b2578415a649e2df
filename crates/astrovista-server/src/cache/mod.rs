//! Response and translation caching.
//!
//! ```text
//! read handler ──► ExternalCache (Redis, fail-open) ──► storage
//! translator   ──► TwoTierTranslationCache
//!                    ├─ tier 2: ExternalCache
//!                    └─ tier 1: BoundedLocalCache
//! ```
//!
//! If Redis is unavailable or disabled every `ExternalCache` call degrades
//! to a miss or a no-op, and translation caching continues in tier 1 only.

pub mod deadline;
pub mod error;
pub mod external;
pub mod keys;
pub mod local;
pub mod store;

pub use deadline::Deadline;
pub use error::CacheError;
pub use external::ExternalCache;
pub use local::{BoundedLocalCache, CacheStats};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
