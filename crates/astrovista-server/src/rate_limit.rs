//! Per-client sliding-window rate limiting.
//!
//! Every admitted request records its instant in the client's window. A
//! request is rejected when the window already holds `max_requests` instants
//! younger than `window`. Rejected requests are not recorded.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::response::PrettyJson;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn is_allowed(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Admission check against an explicit clock reading.
    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let timestamps = windows.entry(client.to_string()).or_default();
        prune(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Drops clients with no request inside the window. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }

    /// Runs [`RateLimiter::sweep`] every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept idle rate limit windows");
                }
            }
        })
    }
}

/// Keeps only instants in `(now - window, now]`.
fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    // Before the clock has run for a full window nothing can be stale.
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    while timestamps.front().is_some_and(|ts| *ts <= cutoff) {
        timestamps.pop_front();
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trust_forwarded_headers: bool,
}

/// Rejection returned by [`rate_limit_middleware`].
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            PrettyJson(json!({ "error": RATE_LIMIT_MESSAGE })),
        )
            .into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Client identity: the peer IP, or the first `X-Forwarded-For` entry when
/// forwarded headers are trusted.
fn client_key(request: &Request<Body>, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers
        && let Some(forwarded_for) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
        && let Some(first) = forwarded_for.split(',').next()
        && let Ok(ip) = first.trim().parse::<std::net::IpAddr>()
    {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects with 429 and `Retry-After` without running the inner handler.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client = client_key(&request, state.trust_forwarded_headers);

    if !state.limiter.is_allowed(&client) {
        tracing::info!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        crate::metrics::record_rate_limit_rejection();
        return Err(RateLimitError {
            retry_after: state.limiter.window().as_secs().max(1),
        });
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::post};
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_boundary() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.is_allowed("10.0.0.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.is_allowed("a"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!limiter.is_allowed("a"));
        // Only the admitted request at t=0 counts, so t=61 is free again.
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.is_allowed("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
        assert!(!limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_idle_clients() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.is_allowed("a");
        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.is_allowed("b");
        assert_eq!(limiter.tracked_clients(), 2);

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(10)));
        limiter.is_allowed("a");
        let handle = limiter.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(limiter.tracked_clients(), 0);
        handle.abort();
    }

    fn app(trust_forwarded_headers: bool) -> Router {
        let state = RateLimitState {
            limiter: Arc::new(RateLimiter::new(1, Duration::from_secs(60))),
            trust_forwarded_headers,
        };
        Router::new()
            .route("/apod", post(|| async { StatusCode::CREATED }))
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
    }

    fn request(peer: &str, forwarded: Option<&str>) -> Request<Body> {
        let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
        let mut builder = Request::builder()
            .method("POST")
            .uri("/apod")
            .extension(ConnectInfo(addr));
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_middleware_rejects_with_retry_after() {
        let app = app(false);

        let first = app.clone().oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.clone().oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[header::RETRY_AFTER], "60");
        let body = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], RATE_LIMIT_MESSAGE);

        let other = app.oneshot(request("10.0.0.2", None)).await.unwrap();
        assert_eq!(other.status(), StatusCode::CREATED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_for_only_when_trusted() {
        let untrusted = app(false);
        let ok = untrusted
            .clone()
            .oneshot(request("10.0.0.9", Some("1.1.1.1")))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::CREATED);
        let spoofed = untrusted
            .oneshot(request("10.0.0.9", Some("2.2.2.2")))
            .await
            .unwrap();
        assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);

        let trusted = app(true);
        let a = trusted
            .clone()
            .oneshot(request("10.0.0.9", Some("1.1.1.1, 10.0.0.9")))
            .await
            .unwrap();
        let b = trusted
            .oneshot(request("10.0.0.9", Some("2.2.2.2")))
            .await
            .unwrap();
        assert_eq!(a.status(), StatusCode::CREATED);
        assert_eq!(b.status(), StatusCode::CREATED);
    }
}
