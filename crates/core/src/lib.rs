pub mod config;
pub mod models;
pub mod workflow;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::{StatusResponse, ValidationError};

/// Maximum accepted size of inbound request bodies and GitHub API responses.
pub const MAX_BODY_SIZE: usize = 1 << 20;

/// Error returned by the ingress handlers. Rendered as a JSON
/// [`StatusResponse`] with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request body: {0}")]
    Decode(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid repo_url: {0}")]
    Parse(String),
    #[error("GitHub App not installed on repository {owner}/{repo}")]
    InstallationNotFound { owner: String, repo: String },
    #[error("{0}")]
    Auth(&'static str),
    #[error("Failed to create commit status: {0}")]
    Publish(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Validation(_) | Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::InstallationNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Auth(_) | Self::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{message}");
        } else {
            tracing::warn!(status = status.as_u16(), "{message}");
        }
        (status, Json(StatusResponse::error(message))).into_response()
    }
}
