use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tokio::task::JoinHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use astrovista_storage::DynStorage;

use crate::cache::ExternalCache;
use crate::config::{AppConfig, StorageBackend};
use crate::handlers::{self, apod, apods, cache, languages, search};
use crate::i18n::{Locales, Translator};
use crate::middleware as app_middleware;
use crate::nasa::NasaClient;
use crate::rate_limit::{RateLimitState, RateLimiter, rate_limit_middleware};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: DynStorage,
    pub cache: ExternalCache,
    pub translator: Translator,
    pub locales: Arc<Locales>,
    pub nasa: NasaClient,
    pub rate_limiter: Arc<RateLimiter>,
}

pub struct AstrovistaServer {
    addr: SocketAddr,
    app: Router,
    sweepers: Vec<JoinHandle<()>>,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let rate_limit = RateLimitState {
        limiter: Arc::clone(&state.rate_limiter),
        trust_forwarded_headers: state.config.server.trust_forwarded_headers,
    };

    // Only POST /apod is rate limited; GET on the same path is not.
    let apod_routes = get(apod::get_latest).merge(
        post(apod::create_apod)
            .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware)),
    );

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        // APOD endpoints
        .route("/apod", apod_routes)
        .route("/apod/{date}", get(apod::get_by_date))
        .route("/apods", get(apods::list_all))
        .route("/apods/date-range", get(apods::date_range))
        .route("/apods/search", get(search::search))
        .route("/languages", get(languages::list_languages))
        .route("/cache", delete(cache::clear_cache))
        .with_state(state)
        // Middleware stack (order: metrics -> compression/cors/trace -> body limit -> request id)
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(app_middleware::X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(app_middleware::request_id))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Connects storage and the external cache, selects the translation
    /// provider and starts the rate limiter and translation cache sweepers.
    ///
    /// An unreachable Redis does not fail the build; the cache comes up
    /// disabled instead.
    pub async fn build(self) -> anyhow::Result<AstrovistaServer> {
        let cfg = self.config;
        cfg.validate().map_err(anyhow::Error::msg)?;

        let storage: DynStorage = match cfg.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage");
                astrovista_db_memory::create_storage()
            }
            StorageBackend::Postgres => {
                let storage =
                    astrovista_db_postgres::PostgresStorage::new(cfg.storage.postgres.clone())
                        .await
                        .context("PostgreSQL storage initialization failed")?;
                Arc::new(storage)
            }
        };

        let cache = ExternalCache::connect(&cfg.redis).await;
        let translator = Translator::from_config(&cfg.translation, &cfg.cache, cache.clone())
            .context("translation provider initialization failed")?;

        let locales = match cfg.translation.locales_dir.as_deref() {
            Some(dir) => Locales::load_dir(dir)
                .with_context(|| format!("loading locales from {}", dir.display()))?,
            None => Locales::builtin(),
        };

        let nasa = NasaClient::new(&cfg.nasa).context("NASA client initialization failed")?;

        let rate_limiter = Arc::new(RateLimiter::from_config(&cfg.rate_limit));
        let sweepers = vec![
            rate_limiter.spawn_sweeper(cfg.rate_limit.sweep_interval()),
            translator.spawn_cache_sweeper(cfg.cache.local_sweep_interval()),
        ];

        let addr = cfg.addr();
        let state = AppState {
            config: Arc::new(cfg),
            storage,
            cache,
            translator,
            locales: Arc::new(locales),
            nasa,
            rate_limiter,
        };

        Ok(AstrovistaServer {
            addr,
            app: build_app(state),
            sweepers,
        })
    }
}

impl AstrovistaServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let result = axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;
        for sweeper in &self.sweepers {
            sweeper.abort();
        }
        result?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
