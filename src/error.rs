use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Upstream conditions that are recovered locally. They never reach the
/// caller; they only label logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    DelegateUnavailable,
    GenerationUnavailable,
    MalformedUpstreamPayload,
}

impl Degradation {
    pub fn as_str(self) -> &'static str {
        match self {
            Degradation::DelegateUnavailable => "delegate_unavailable",
            Degradation::GenerationUnavailable => "generation_unavailable",
            Degradation::MalformedUpstreamPayload => "malformed_upstream_payload",
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Config(msg) => tracing::error!(error = %msg, "Configuration error"),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, error.type = "internal", "Internal error")
            }
            AppError::Validation(_) => {}
        }

        let (status, error_message) = self.status_and_message();

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_error() {
        let error = AppError::Validation("country is required".to_string());
        assert_eq!(error.to_string(), "Validation error: country is required");
    }

    #[test]
    fn test_internal_error() {
        let error = AppError::Internal("unexpected".to_string());
        assert_eq!(error.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (
                AppError::Validation("test".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Config("test".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Internal("test".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status_and_message().0, expected_status);
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let (_, message) = AppError::Internal("serializer exploded".into()).status_and_message();
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Validation("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_degradation_labels() {
        assert_eq!(
            Degradation::DelegateUnavailable.as_str(),
            "delegate_unavailable"
        );
        assert_eq!(
            Degradation::GenerationUnavailable.as_str(),
            "generation_unavailable"
        );
        assert_eq!(
            Degradation::MalformedUpstreamPayload.as_str(),
            "malformed_upstream_payload"
        );
    }
}
