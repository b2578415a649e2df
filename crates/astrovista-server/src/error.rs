//! HTTP-facing error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use astrovista_storage::StorageError;

use crate::nasa::NasaError;
use crate::response::PrettyJson;

/// Errors mapped to an HTTP status and a `{"error", "details"}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        details: Option<String>,
    },
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        details: Option<String>,
    },
    #[error("Upstream error: {message}")]
    Upstream { message: String, details: String },
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {message}")]
    Internal { message: String, details: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Adds a `details` field where the variant carries an optional one.
    pub fn with_details(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::BadRequest { details, .. }
            | Self::NotFound { details, .. }
            | Self::Conflict { details, .. } => *details = Some(value.into()),
            _ => {}
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody<'_> {
        match self {
            Self::BadRequest { message, details }
            | Self::NotFound { message, details }
            | Self::Conflict { message, details } => ErrorBody {
                error: message,
                details: details.as_deref(),
            },
            Self::Unauthorized(message) | Self::Unavailable(message) => ErrorBody {
                error: message,
                details: None,
            },
            Self::Upstream { message, details } | Self::Internal { message, details } => {
                ErrorBody {
                    error: message,
                    details: Some(details),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, PrettyJson(self.body())).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::debug!(category = %err.category(), error = %err, "Storage error");
        match &err {
            StorageError::NotFound { date } => {
                Self::not_found("Document not found").with_details(date.clone())
            }
            StorageError::AlreadyExists { date } => Self::Conflict {
                message: "APOD already exists for this date".into(),
                details: Some(date.clone()),
            },
            StorageError::InvalidQuery { message } => {
                Self::bad_request("Invalid query").with_details(message.clone())
            }
            StorageError::ConnectionError { .. } => Self::Unavailable(err.to_string()),
            StorageError::Internal { .. } => Self::internal("Storage error", err.to_string()),
        }
    }
}

impl From<NasaError> for ApiError {
    fn from(err: NasaError) -> Self {
        let message = match &err {
            NasaError::Http(_) => "Error fetching data from NASA API",
            NasaError::Status { .. } => "NASA API returned an error",
            NasaError::Decode(_) => "Error decoding NASA API response",
        };
        Self::Upstream {
            message: message.into(),
            details: err.to_string(),
        }
    }
}
