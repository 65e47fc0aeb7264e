use crate::{
    directory::DirectoryError, feed::FeedError, rate_limit::RateLimitError, store::StoreError,
};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

/// Field name -> human readable messages for that field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("validation failed: {0:?}")]
    ValidationError(FieldErrors),
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("server overloaded")]
    Overloaded,
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),
}

impl ApiError {
    /// Stable machine-readable kind, shared with the UI.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::ValidationError(_) => "BAD_REQUEST",
            ApiError::RateLimited { .. } | ApiError::Overloaded => "TOO_MANY_REQUESTS",
            ApiError::InternalError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::UpstreamUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::UpstreamTimeout(_) => "TIMEOUT",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } | ApiError::Overloaded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        ApiError::ValidationError(fields)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ApiError::ValidationError(fields)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::UpstreamUnavailable(format!("post store: {e}"))
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Timeout(_) => ApiError::UpstreamTimeout(format!("identity service: {e}")),
            _ => ApiError::UpstreamUnavailable(format!("identity service: {e}")),
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(e: RateLimitError) -> Self {
        ApiError::UpstreamUnavailable(format!("rate limiter: {e}"))
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::AuthorNotFound { .. } => ApiError::InternalError(e.to_string()),
            FeedError::Directory(inner) => inner.into(),
        }
    }
}

/// Convert our custom errors to HTTP responses
///
/// Internal and upstream details are logged, never sent to the client.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            ApiError::ValidationError(fields) => serde_json::json!({
                "error": "Validation failed",
                "code": code,
                "fields": fields,
            }),
            ApiError::RateLimited { retry_after_secs } => serde_json::json!({
                "error": "You are posting too fast",
                "code": code,
                "retryAfterSecs": retry_after_secs,
            }),
            ApiError::Overloaded => serde_json::json!({
                "error": "Too many requests",
                "code": code,
            }),
            ApiError::Unauthorized => serde_json::json!({ "error": "Unauthorized", "code": code }),
            ApiError::NotFound => serde_json::json!({ "error": "Not Found", "code": code }),
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                serde_json::json!({ "error": "Internal server error", "code": code })
            }
            ApiError::UpstreamUnavailable(msg) => {
                error!("Upstream unavailable: {}", msg);
                serde_json::json!({ "error": "Service temporarily unavailable", "code": code })
            }
            ApiError::UpstreamTimeout(msg) => {
                warn!("Upstream timeout: {}", msg);
                serde_json::json!({ "error": "Service temporarily unavailable", "code": code })
            }
        };

        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimited {
            retry_after_secs: Some(secs),
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
