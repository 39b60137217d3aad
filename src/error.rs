//! Error types for Rigel voice

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for Rigel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the application surface (config, server, setup)
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP server error
    #[error("server error: {0}")]
    Server(String),

    /// Speech pipeline error
    #[error("speech error: {0}")]
    Speech(#[from] SpeechError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Faults raised while turning a segment into an audio artifact
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Voice model file is not where the configuration says it is
    #[error("voice model not found at {}", .0.display())]
    ModelMissing(PathBuf),

    /// Synthesis exceeded its deadline and was killed
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// Synthesis engine exited unsuccessfully
    #[error("synthesis engine exited with {}: {stderr}", exit_label(.exit_code))]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Spawning, feeding or reading back from the engine failed
    #[error("synthesis io failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

/// Faults raised while playing an artifact
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Artifact was handed over before its synthesis completed
    #[error("artifact {0} is not ready for playback")]
    NotReady(String),

    /// Playback exceeded its deadline and was killed
    #[error("playback timed out after {0:?}")]
    Timeout(Duration),

    /// Playback engine exited unsuccessfully
    #[error("playback engine exited with {}: {stderr}", exit_label(.exit_code))]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Spawning or waiting on the player failed
    #[error("playback io failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

/// Terminal outcome of a failed `speak` run
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("synthesis failed: {0}")]
    SynthesisFailed(#[from] SynthesisError),

    #[error("playback failed: {0}")]
    PlaybackFailed(#[from] PlaybackError),
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}
