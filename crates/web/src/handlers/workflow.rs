use std::sync::Arc;

use axum::{Json, extract::State};
use status_proxy_core::{AppError, models::StatusResponse, workflow::WorkflowEvent};
use status_proxy_github::GitHubApp;

use crate::handlers::common::{JsonBody, publish};

/// `POST /workflow`: translate an Argo Workflows notification into a commit status.
pub async fn post_workflow(
    State(github): State<Arc<GitHubApp>>,
    JsonBody(mut event): JsonBody<WorkflowEvent>,
) -> Result<Json<StatusResponse>, AppError> {
    event.normalize();
    tracing::debug!(
        started_at = event.started_at.as_deref(),
        finished_at = event.finished_at.as_deref(),
        "Parsed workflow event: {:?}",
        event
    );
    let workflow = format!("{}/{}", event.namespace, event.workflow_name);
    let intent = event.into_intent()?;
    if intent.target_url.is_none() {
        tracing::debug!("Workflow {} has no target_url; status will not link to the UI", workflow);
    }
    let repo = publish(&github, &intent).await?;
    tracing::info!(
        "Created commit status for workflow {}: {}@{} (state: {}, context: {})",
        workflow,
        repo,
        intent.sha,
        intent.state,
        intent.context
    );
    Ok(Json(StatusResponse::ok("Workflow notification processed successfully")))
}
