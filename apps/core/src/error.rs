use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or placeholder credentials, or an unset upstream URL/model.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generative API call failed, timed out, or returned a malformed envelope.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The prompt was rejected as empty, unrelated, or ambiguous.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The classifier response could not be turned into a usable result.
    /// Always intercepted by the validator's fallback path; never reaches
    /// the request boundary.
    #[error("Classification error: {0}")]
    Classification(String),

    /// The model produced no parseable or no valid schedule.
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Missing, expired, or undecodable access token.
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl AppError {
    /// HTTP status this error maps to at the request boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(format!("HTTP error: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Upstream(format!("Request timed out: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}
