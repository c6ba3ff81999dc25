use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use status_proxy_core::{AppError, models::StatusIntent};
use status_proxy_github::{GitHubApp, RepoRef, parse_repo_url};

/// JSON request body. Unlike `axum::Json`, every failure (oversized body,
/// missing content type, malformed JSON) is a 400 [`AppError::Decode`].
///
/// The size limit comes from the router's `DefaultBodyLimit`.
#[must_use]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Decode(rejection.body_text()))?;
        serde_json::from_slice(&body).map(JsonBody).map_err(|e| AppError::Decode(e.to_string()))
    }
}

/// Resolve the target repository and post `intent` to it.
pub async fn publish(github: &GitHubApp, intent: &StatusIntent) -> Result<RepoRef, AppError> {
    let repo = parse_repo_url(&intent.repository).map_err(|e| AppError::Parse(e.to_string()))?;
    tracing::debug!("Parsed repository: owner={}, repo={}", repo.owner, repo.repo);
    if let Err(e) = github.post_status(&repo, intent).await {
        tracing::error!("Failed to post commit status for {}@{}: {}", repo, intent.sha, e);
        return Err(e.into_app_error(&repo));
    }
    Ok(repo)
}

pub async fn healthz() -> &'static str { "OK" }

pub async fn method_not_allowed() -> AppError { AppError::MethodNotAllowed }
