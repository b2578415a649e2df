//! Sliding-window admission on POST /apod through the full router.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use astrovista_server::cache::ExternalCache;
use astrovista_server::rate_limit::RATE_LIMIT_MESSAGE;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use common::{app, fixtures, send};

fn post_from(peer: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{peer}:51000").parse().unwrap();
    // No token: admitted requests stop at authorization without calling NASA.
    Request::builder()
        .method("POST")
        .uri("/apod")
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_one_request_per_minute_per_client() {
    let app = app(fixtures(), ExternalCache::disabled());

    let first = send(&app, post_from("203.0.113.5")).await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);

    tokio::time::advance(Duration::from_secs(10)).await;
    let second = send(&app, post_from("203.0.113.5")).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.header("retry-after"), Some("60"));
    assert_eq!(second.json["error"], RATE_LIMIT_MESSAGE);

    let other = send(&app, post_from("203.0.113.6")).await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);

    tokio::time::advance(Duration::from_secs(51)).await;
    let third = send(&app, post_from("203.0.113.5")).await;
    assert_eq!(third.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn test_reads_are_not_rate_limited() {
    let app = app(fixtures(), ExternalCache::disabled());

    assert_eq!(send(&app, post_from("198.51.100.1")).await.status, StatusCode::UNAUTHORIZED);
    for _ in 0..5 {
        let request = Request::builder()
            .uri("/apod")
            .extension(ConnectInfo("198.51.100.1:51000".parse::<SocketAddr>().unwrap()))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status, StatusCode::OK);
    }
}
