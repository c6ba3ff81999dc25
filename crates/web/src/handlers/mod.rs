use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, post},
};
use status_proxy_core::MAX_BODY_SIZE;

use crate::AppState;

mod common;
mod status;
mod workflow;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/status", post(status::post_status).fallback(common::method_not_allowed))
        .route("/workflow", post(workflow::post_workflow).fallback(common::method_not_allowed))
        .route("/healthz", any(common::healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}
