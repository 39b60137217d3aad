//! Speech trigger endpoint
//!
//! `GET /data/speak/{text}` speaks the (percent-decoded) path text and
//! answers once playback has finished.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use super::ApiState;

/// Build speak router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/data/speak/{text}", get(speak))
        .with_state(state)
}

/// Speak the requested text
///
/// Callers only get coarse success or failure; details go to the log.
async fn speak(State(state): State<Arc<ApiState>>, Path(text): Path<String>) -> Response {
    tracing::info!(chars = text.chars().count(), "received speak request");

    let _guard = state.speaking.lock().await;
    match state.pipeline.speak(&text).await {
        Ok(()) => Json(json!({ "success": "completed" })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "speak request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "False" })),
            )
                .into_response()
        }
    }
}
