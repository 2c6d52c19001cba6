use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not connected to GitHub")]
    NotConnected,

    #[error("A batch run is already in progress: {0}")]
    BatchInProgress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Claude API rate limited: {0}")]
    ClaudeRateLimited(String),

    #[error("Malformed model output: {0}")]
    Analysis(String),

    #[error("Preference store error: {0}")]
    Preferences(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotConnected => (StatusCode::UNAUTHORIZED, "not_connected"),
            AppError::BatchInProgress(_) => (StatusCode::CONFLICT, "batch_in_progress"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::WebhookVerification(_) => (StatusCode::UNAUTHORIZED, "webhook_verification"),
            AppError::GitHubApi(_) => (StatusCode::BAD_GATEWAY, "github_error"),
            AppError::ClaudeApi(_) | AppError::Analysis(_) => (StatusCode::BAD_GATEWAY, "ai_error"),
            AppError::ClaudeRateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "ai_rate_limited"),
            AppError::Serialization(_) => (StatusCode::BAD_REQUEST, "json_error"),
            AppError::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            AppError::Config(_) | AppError::Preferences(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
