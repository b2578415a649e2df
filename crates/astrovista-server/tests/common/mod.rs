#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use astrovista_core::Apod;
use astrovista_db_memory::InMemoryStorage;
use astrovista_server::cache::{ExternalCache, MemoryStore};
use astrovista_server::i18n::{Locales, Translator};
use astrovista_server::nasa::NasaClient;
use astrovista_server::{AppConfig, AppState, RateLimiter, build_app};
use astrovista_storage::DynStorage;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";

pub fn fixtures() -> Vec<Apod> {
    let mut orion = Apod::new("2024-03-08".parse().unwrap(), "Orion Nebula")
        .with_explanation("A stellar nursery in Orion.");
    orion.copyright = Some("Jane Doe".into());
    vec![
        Apod::new("2024-03-06".parse().unwrap(), "Crab Nebula")
            .with_explanation("Remains of a supernova."),
        Apod::new("2024-03-07".parse().unwrap(), "Solar Eclipse")
            .with_explanation("The Moon covers the Sun.")
            .with_media_type("video"),
        orion,
    ]
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.internal_api_token = Some(TOKEN.into());
    config
}

pub fn memory_cache() -> ExternalCache {
    ExternalCache::with_store(Arc::new(MemoryStore::new()), Duration::from_secs(1))
}

pub fn state(records: Vec<Apod>, cache: ExternalCache, config: AppConfig) -> AppState {
    let storage: DynStorage = Arc::new(InMemoryStorage::with_records(records));
    AppState {
        nasa: NasaClient::new(&config.nasa).unwrap(),
        rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
        config: Arc::new(config),
        storage,
        cache,
        translator: Translator::mock(),
        locales: Arc::new(Locales::builtin()),
    }
}

pub fn app(records: Vec<Apod>, cache: ExternalCache) -> Router {
    build_app(state(records, cache, config()))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        json,
    }
}
