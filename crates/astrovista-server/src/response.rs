//! JSON response helpers.

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const SIZE: HeaderName = HeaderName::from_static("size");

/// JSON body indented with four spaces. Field order follows the
/// serialized type.
#[derive(Debug, Clone)]
pub struct PrettyJson<T>(pub T);

pub fn to_pretty_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match to_pretty_vec(&self.0) {
            Ok(body) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                    r#"{"error": "Serialization failure"}"#,
                )
                    .into_response()
            }
        }
    }
}

/// Whether a response body came from the shared cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn header_value(self) -> HeaderValue {
        match self {
            Self::Hit => HeaderValue::from_static("HIT"),
            Self::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        b: u8,
        a: &'static str,
    }

    #[test]
    fn test_four_space_indent_keeps_field_order() {
        let out = to_pretty_vec(&Sample { b: 1, a: "x" }).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n    \"b\": 1,\n    \"a\": \"x\"\n}\n"
        );
    }

    #[tokio::test]
    async fn test_into_response_sets_content_type() {
        let response = PrettyJson(serde_json::json!({"ok": true})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn test_cache_status_header() {
        assert_eq!(CacheStatus::Hit.header_value(), "HIT");
        assert_eq!(CacheStatus::Miss.header_value(), "MISS");
    }
}
