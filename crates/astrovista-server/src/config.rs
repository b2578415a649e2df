use astrovista_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Machine translation of APOD text
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Upstream NASA APOD API
    #[serde(default)]
    pub nasa: NasaConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if self.storage.backend == StorageBackend::Postgres {
            if self.storage.postgres.url.trim().is_empty() {
                return Err("storage.postgres.url must not be empty".into());
            }
            if self.storage.postgres.pool_size == 0 {
                return Err("storage.postgres.pool_size must be > 0".into());
            }
        }
        if self.redis.enabled {
            if self.redis.url.trim().is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
            if self.redis.timeout_ms == 0 {
                return Err("redis.timeout_ms must be > 0".into());
            }
        }
        if self.cache.request_deadline_ms == 0 {
            return Err("cache.request_deadline_ms must be > 0".into());
        }
        if self.cache.local_capacity == 0 {
            return Err("cache.local_capacity must be > 0".into());
        }
        if self.cache.local_ttl_secs == 0 || self.cache.translation_ttl_secs == 0 {
            return Err("cache TTLs must be > 0".into());
        }
        if self.rate_limit.max_requests == 0 {
            return Err("rate_limit.max_requests must be > 0".into());
        }
        if self.rate_limit.window_secs == 0 {
            return Err("rate_limit.window_secs must be > 0".into());
        }
        if self.cache.local_sweep_interval_secs == 0 {
            return Err("cache.local_sweep_interval_secs must be > 0".into());
        }
        if self.rate_limit.sweep_interval_secs == 0 {
            return Err("rate_limit.sweep_interval_secs must be > 0".into());
        }
        let has_key = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.is_empty());
        match self.translation.provider {
            TranslationProviderKind::Google if !has_key(&self.translation.google_api_key) => {
                return Err("translation.provider=google requires translation.google_api_key".into());
            }
            TranslationProviderKind::Deepl if !has_key(&self.translation.deepl_api_key) => {
                return Err("translation.provider=deepl requires translation.deepl_api_key".into());
            }
            _ => {}
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.cache.request_deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Use `X-Forwarded-For` as the client address for rate limiting.
    /// Only enable behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    // 1 MiB
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            trust_forwarded_headers: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

/// Redis configuration for the shared response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Injected into the URL when the URL has none.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    /// Bound on connect and on every individual operation.
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
    /// Prepended to every key so several deployments can share a database.
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

fn default_redis_key_prefix() -> String {
    "astrovista:".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            password: None,
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Budget shared by the cache lookup and the storage query of one request.
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
    /// Tier-1 translation cache capacity.
    #[serde(default = "default_local_capacity")]
    pub local_capacity: usize,
    #[serde(default = "default_local_ttl_secs")]
    pub local_ttl_secs: u64,
    /// Tier-2 (Redis) translation TTL.
    #[serde(default = "default_translation_ttl_secs")]
    pub translation_ttl_secs: u64,
    /// How often expired tier-1 entries are swept.
    #[serde(default = "default_local_sweep_interval_secs")]
    pub local_sweep_interval_secs: u64,
}

fn default_request_deadline_ms() -> u64 {
    10_000
}

fn default_local_capacity() -> usize {
    1000
}

fn default_local_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_translation_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_local_sweep_interval_secs() -> u64 {
    60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            request_deadline_ms: default_request_deadline_ms(),
            local_capacity: default_local_capacity(),
            local_ttl_secs: default_local_ttl_secs(),
            translation_ttl_secs: default_translation_ttl_secs(),
            local_sweep_interval_secs: default_local_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn local_ttl(&self) -> Duration {
        Duration::from_secs(self.local_ttl_secs)
    }

    pub fn translation_ttl(&self) -> Duration {
        Duration::from_secs(self.translation_ttl_secs)
    }

    pub fn local_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.local_sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_requests() -> usize {
    1
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProviderKind {
    /// Google when its key is set, then DeepL, then the mock.
    #[default]
    Auto,
    Google,
    Deepl,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProviderKind,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub deepl_api_key: Option<String>,
    #[serde(default)]
    pub google_base_url: Option<String>,
    /// Overrides the endpoint otherwise derived from the key type.
    #[serde(default)]
    pub deepl_base_url: Option<String>,
    #[serde(default = "default_translation_timeout_ms")]
    pub timeout_ms: u64,
    /// Directory of `<lang>.json` message overrides.
    #[serde(default)]
    pub locales_dir: Option<PathBuf>,
}

fn default_translation_timeout_ms() -> u64 {
    10_000
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProviderKind::Auto,
            google_api_key: None,
            deepl_api_key: None,
            google_base_url: None,
            deepl_base_url: None,
            timeout_ms: default_translation_timeout_ms(),
            locales_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NasaConfig {
    #[serde(default = "default_nasa_api_key")]
    pub api_key: String,
    #[serde(default = "default_nasa_base_url")]
    pub base_url: String,
    #[serde(default = "default_nasa_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_nasa_api_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_nasa_base_url() -> String {
    "https://api.nasa.gov".to_string()
}

fn default_nasa_timeout_ms() -> u64 {
    10_000
}

impl Default for NasaConfig {
    fn default() -> Self {
        Self {
            api_key: default_nasa_api_key(),
            base_url: default_nasa_base_url(),
            timeout_ms: default_nasa_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Token expected in `X-API-Token` on `POST /apod`. Unset rejects every
    /// write.
    #[serde(default)]
    pub internal_api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "astrovista.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., ASTROVISTA__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("ASTROVISTA")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rate_limit.max_requests, 1);
        assert_eq!(cfg.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(cfg.cache.local_capacity, 1000);
        assert_eq!(cfg.cache.local_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.cache.translation_ttl(), Duration::from_secs(30 * 86_400));
        assert_eq!(cfg.request_deadline(), Duration::from_secs(10));
        assert_eq!(cfg.nasa.api_key, "DEMO_KEY");
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert!(!cfg.redis.enabled);
        assert_eq!(cfg.redis.key_prefix, "astrovista:");
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut cfg = AppConfig::default();
        cfg.rate_limit.window_secs = 0;
        assert!(cfg.validate().unwrap_err().contains("window_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_requires_provider_key() {
        let mut cfg = AppConfig::default();
        cfg.translation.provider = TranslationProviderKind::Deepl;
        assert!(cfg.validate().is_err());
        cfg.translation.deepl_api_key = Some("key:fx".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_provider_key() {
        let mut cfg = AppConfig::default();
        cfg.translation.provider = TranslationProviderKind::Google;
        cfg.translation.google_api_key = Some(String::new());
        assert!(cfg.validate().is_err());

        cfg.translation.provider = TranslationProviderKind::Deepl;
        cfg.translation.deepl_api_key = Some(String::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_addr_falls_back_to_unspecified() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not-an-ip".into();
        cfg.server.port = 3000;
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[redis]
enabled = true
url = "redis://cache:6379"

[rate_limit]
max_requests = 5

[translation]
provider = "mock"
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cfg = loader::load_config(Some(&path)).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert!(cfg.redis.enabled);
        assert_eq!(cfg.redis.url, "redis://cache:6379");
        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert_eq!(cfg.rate_limit.window_secs, 60);
        assert_eq!(cfg.translation.provider, TranslationProviderKind::Mock);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = loader::load_config(Some("/nonexistent/astrovista.toml")).unwrap_err();
        assert!(err.contains("not found"));
    }
}
