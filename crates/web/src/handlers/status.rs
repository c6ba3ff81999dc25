use std::sync::Arc;

use axum::{Json, extract::State};
use status_proxy_core::{
    AppError,
    models::{StatusRequest, StatusResponse},
};
use status_proxy_github::GitHubApp;

use crate::handlers::common::{JsonBody, publish};

/// `POST /status`: create a commit status from an explicit request.
pub async fn post_status(
    State(github): State<Arc<GitHubApp>>,
    JsonBody(request): JsonBody<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::debug!("Parsed status request: {:?}", request);
    let intent = request.into_intent()?;
    let repo = publish(&github, &intent).await?;
    tracing::info!(
        "Created commit status for {}@{} (state: {}, context: {})",
        repo,
        intent.sha,
        intent.state,
        intent.context
    );
    Ok(Json(StatusResponse::ok("Commit status created successfully")))
}
