//! TOML configuration file loading
//!
//! Supports `~/.config/rigel/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::speech::SynthesisFailurePolicy;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RigelConfigFile {
    /// Speech synthesis and playback
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Speech pipeline configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Path to the Piper voice model (`.onnx`)
    pub voice_model: Option<String>,

    /// Synthesis engine program (e.g. "piper" or "python3.10")
    pub engine: Option<String>,

    /// Arguments placed before the Piper flags (e.g. ["-m", "piper"])
    pub engine_args: Option<Vec<String>>,

    /// Playback program (e.g. "aplay" or "paplay")
    pub player: Option<String>,

    /// Arguments placed before the artifact path
    pub player_args: Option<Vec<String>>,

    /// Directory for temporary WAV files
    pub artifact_dir: Option<String>,

    /// Synthesis deadline in seconds
    pub synthesis_timeout_secs: Option<u64>,

    /// Playback deadline in seconds
    pub playback_timeout_secs: Option<u64>,

    /// "finish-current" or "abort"
    pub on_synthesis_failure: Option<SynthesisFailurePolicy>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Address to bind
    pub host: Option<String>,

    /// API server port
    pub port: Option<u16>,
}

/// What happened when the config file was read
///
/// Loading runs before the log subscriber is installed, so the outcome is
/// kept here and reported with [`ConfigFileStatus::log`] afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFileStatus {
    /// No file at the standard path (or no home directory)
    Missing,
    /// File parsed
    Loaded(PathBuf),
    /// File exists but could not be read; defaults are used
    Unreadable { path: PathBuf, error: String },
    /// File is not valid TOML for this schema; defaults are used
    Malformed { path: PathBuf, error: String },
}

impl ConfigFileStatus {
    /// True when the file was present but ignored
    #[must_use]
    pub const fn is_problem(&self) -> bool {
        matches!(self, Self::Unreadable { .. } | Self::Malformed { .. })
    }

    /// Report the outcome through `tracing`
    pub fn log(&self) {
        match self {
            Self::Missing => tracing::debug!("no config file, using defaults"),
            Self::Loaded(path) => tracing::info!(path = %path.display(), "loaded config file"),
            Self::Unreadable { path, error } => tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read config file, using defaults"
            ),
            Self::Malformed { path, error } => tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse config file, using defaults"
            ),
        }
    }
}

/// Load the TOML config file from the standard path
///
/// Falls back to `RigelConfigFile::default()` if the file doesn't exist or
/// can't be parsed; the status says which.
pub fn load_config_file() -> (RigelConfigFile, ConfigFileStatus) {
    config_file_path().map_or_else(
        || (RigelConfigFile::default(), ConfigFileStatus::Missing),
        |path| load_config_file_at(&path),
    )
}

/// Load a TOML config file from an explicit path, falling back to defaults
pub fn load_config_file_at(path: &Path) -> (RigelConfigFile, ConfigFileStatus) {
    if !path.exists() {
        return (RigelConfigFile::default(), ConfigFileStatus::Missing);
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => (config, ConfigFileStatus::Loaded(path.to_path_buf())),
            Err(e) => (
                RigelConfigFile::default(),
                ConfigFileStatus::Malformed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                },
            ),
        },
        Err(e) => (
            RigelConfigFile::default(),
            ConfigFileStatus::Unreadable {
                path: path.to_path_buf(),
                error: e.to_string(),
            },
        ),
    }
}

/// Return the config file path: `~/.config/rigel/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("rigel").join("config.toml"))
}
