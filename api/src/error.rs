use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tcm_core::IntakeError;
use tcm_core::error::{self, ApiError};

use crate::llm::LlmError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// No route for the request (404)
    NotFound(String),
    /// Language model call failed (502)
    Upstream(String),
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("No route for {path}"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: Some("See /swagger-ui for the available endpoints.".to_string()),
                },
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Language model error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::UPSTREAM_ERROR.to_string(),
                        message: "The consultation model is unavailable".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(
                            "Retry later, or call POST /v1/tools/pattern-analysis for the \
                             deterministic analysis alone."
                                .to_string(),
                        ),
                    },
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        AppError::Validation {
            message: err.to_string(),
            field: Some(err.field().to_string()),
            received: None,
            docs_hint: Some(
                "keySymptoms is required. tongue, pulse, constitution, lifestyle and duration \
                 are optional free text."
                    .to_string(),
            ),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            // A base URL that cannot be joined is our misconfiguration, not the provider's.
            LlmError::Url(_) => AppError::Internal(err.to_string()),
            _ => AppError::Upstream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        (status, serde_json::from_slice(&bytes).expect("body should be json"))
    }

    #[tokio::test]
    async fn intake_error_names_the_field() {
        let (status, body) = render(IntakeError::MissingKeySymptoms.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["field"], "keySymptoms");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn provider_failure_hides_upstream_body() {
        let err = LlmError::Status {
            status: 503,
            body: "secret upstream detail".to_string(),
        };
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_error");
        assert!(!body["message"].as_str().unwrap_or_default().contains("secret"));
    }

    #[tokio::test]
    async fn url_join_failure_is_internal() {
        let err = LlmError::Url(url::ParseError::EmptyHost);
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
    }
}
