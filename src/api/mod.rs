//! HTTP API server for Rigel voice

pub mod health;
pub mod speak;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::SpeechConfig;
use crate::speech::PlaybackPipeline;

/// Shared state for API handlers
#[derive(Debug)]
pub struct ApiState {
    pub pipeline: Arc<PlaybackPipeline>,
    /// Serializes `speak` runs so only one drives the output device
    pub speaking: Mutex<()>,
    /// Speech configuration, for readiness checks
    pub speech: Option<SpeechConfig>,
}

impl ApiState {
    #[must_use]
    pub fn new(pipeline: Arc<PlaybackPipeline>) -> Self {
        Self {
            pipeline,
            speaking: Mutex::new(()),
            speech: None,
        }
    }

    /// Attach the speech configuration used for readiness checks
    #[must_use]
    pub fn with_speech_config(mut self, speech: SpeechConfig) -> Self {
        self.speech = Some(speech);
        self
    }
}

/// Build the full application router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(speak::router(Arc::clone(&state)))
        .merge(health::router())
        .merge(health::ready_router(state))
        .layer(TraceLayer::new_for_http())
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            host: host.into(),
            port,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Server(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Server(format!("API server error: {e}")))?;

        Ok(())
    }
}
