//! Health check endpoints

use std::path::Path;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::config::SpeechConfig;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub voice_model: CheckResult,
    pub engine: CheckResult,
    pub player: CheckResult,
}

impl ReadinessChecks {
    /// Inspect the host for everything the speech pipeline needs
    #[must_use]
    pub fn inspect(speech: &SpeechConfig) -> Self {
        Self {
            voice_model: check_file(&speech.voice_model),
            engine: check_program(&speech.engine),
            player: check_program(&speech.player),
        }
    }

    /// Checks reported when no speech configuration is attached
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            voice_model: CheckResult::unavailable(),
            engine: CheckResult::unavailable(),
            player: CheckResult::unavailable(),
        }
    }

    /// True when no check failed
    #[must_use]
    pub fn all_ok(&self) -> bool {
        [&self.voice_model, &self.engine, &self.player]
            .iter()
            .all(|c| c.status != "fail")
    }
}

/// Result of a single health check
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable() -> Self {
        Self {
            status: "unavailable",
            message: Some("not configured".to_string()),
        }
    }
}

fn check_file(path: &Path) -> CheckResult {
    if path.is_file() {
        CheckResult::ok()
    } else {
        CheckResult::fail(format!("missing: {}", path.display()))
    }
}

fn check_program(program: &Path) -> CheckResult {
    match which::which(program) {
        Ok(_) => CheckResult::ok(),
        Err(e) => CheckResult::fail(format!("{}: {e}", program.display())),
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - can the service actually speak?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let checks = state
        .speech
        .as_ref()
        .map_or_else(ReadinessChecks::unavailable, ReadinessChecks::inspect);

    let all_ok = checks.all_ok();
    let status = if all_ok { "ok" } else { "degraded" };
    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (http_status, Json(ReadinessResponse { status, checks }))
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
