//! Configuration management for Rigel voice
//!
//! Precedence is env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::speech::{
    ArtifactStore, CommandPlayer, DEFAULT_PLAYBACK_TIMEOUT, DEFAULT_SYNTHESIS_TIMEOUT,
    PiperSynthesizer, PipelineOptions, PlaybackPipeline, SynthesisFailurePolicy,
};
use crate::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5001;

/// Rigel voice configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech pipeline configuration
    pub speech: SpeechConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Optional log file (appended to)
    pub log_file: Option<PathBuf>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

/// Speech synthesis and playback configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Piper voice model
    pub voice_model: PathBuf,

    /// Synthesis engine program
    pub engine: PathBuf,

    /// Arguments before the Piper flags
    pub engine_args: Vec<String>,

    /// Playback program
    pub player: PathBuf,

    /// Arguments before the artifact path
    pub player_args: Vec<String>,

    /// Where temporary WAV files live
    pub artifact_dir: PathBuf,

    pub synthesis_timeout: Duration,
    pub playback_timeout: Duration,
    pub on_synthesis_failure: SynthesisFailurePolicy,
}

impl SpeechConfig {
    /// Pipeline tunables derived from this configuration
    #[must_use]
    pub const fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            synthesis_timeout: self.synthesis_timeout,
            playback_timeout: self.playback_timeout,
            on_synthesis_failure: self.on_synthesis_failure,
        }
    }

    /// Build a pipeline wired to the configured engine and player
    ///
    /// # Errors
    ///
    /// Returns error if the artifact directory cannot be created
    pub fn build_pipeline(&self) -> Result<PlaybackPipeline> {
        let store = ArtifactStore::new(&self.artifact_dir)?;
        let synthesizer = PiperSynthesizer::new(&self.engine, &self.voice_model)
            .with_extra_args(self.engine_args.clone());
        let player = CommandPlayer::new(&self.player).with_extra_args(self.player_args.clone());

        Ok(PlaybackPipeline::new(
            Arc::new(synthesizer),
            Arc::new(player),
            store,
            self.pipeline_options(),
        ))
    }
}

/// Default voice model: `~/.local/share/rigel/voices/jarvis-medium.onnx`
fn default_voice_model() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("voices/jarvis-medium.onnx"),
        |d| {
            d.data_dir()
                .join("rigel")
                .join("voices")
                .join("jarvis-medium.onnx")
        },
    )
}

/// Default artifact directory: `~/.cache/rigel/speech`
fn default_artifact_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || std::env::temp_dir().join("rigel-speech"),
        |d| d.cache_dir().join("rigel").join("speech"),
    )
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// Nothing is logged here; the caller reports the returned file status
    /// once a subscriber is installed.
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn load() -> Result<(Self, file::ConfigFileStatus)> {
        let (fc, status) = file::load_config_file();
        let config = Self::resolve(fc, |key| std::env::var(key).ok())?;
        Ok((config, status))
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn resolve<F>(fc: file::RigelConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sc = fc.speech;

        let on_synthesis_failure = match env("RIGEL_ON_SYNTHESIS_FAILURE") {
            Some(raw) => SynthesisFailurePolicy::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "RIGEL_ON_SYNTHESIS_FAILURE must be \"finish-current\" or \"abort\", got {raw:?}"
                ))
            })?,
            None => sc.on_synthesis_failure.unwrap_or_default(),
        };

        let speech = SpeechConfig {
            voice_model: env("RIGEL_VOICE_MODEL")
                .or(sc.voice_model)
                .map_or_else(default_voice_model, PathBuf::from),
            engine: env("RIGEL_TTS_BIN")
                .or(sc.engine)
                .map_or_else(|| PathBuf::from("piper"), PathBuf::from),
            engine_args: env("RIGEL_TTS_ARGS")
                .map(|s| s.split_whitespace().map(ToString::to_string).collect())
                .or(sc.engine_args)
                .unwrap_or_default(),
            player: env("RIGEL_PLAYER_BIN")
                .or(sc.player)
                .map_or_else(|| PathBuf::from("aplay"), PathBuf::from),
            player_args: sc.player_args.unwrap_or_default(),
            artifact_dir: env("RIGEL_ARTIFACT_DIR")
                .or(sc.artifact_dir)
                .map_or_else(default_artifact_dir, PathBuf::from),
            synthesis_timeout: seconds(
                &env,
                "RIGEL_SYNTHESIS_TIMEOUT_SECS",
                sc.synthesis_timeout_secs,
                DEFAULT_SYNTHESIS_TIMEOUT,
            )?,
            playback_timeout: seconds(
                &env,
                "RIGEL_PLAYBACK_TIMEOUT_SECS",
                sc.playback_timeout_secs,
                DEFAULT_PLAYBACK_TIMEOUT,
            )?,
            on_synthesis_failure,
        };

        let port = match env("RIGEL_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("RIGEL_PORT {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };
        let api_server = ApiServerConfig {
            host: env("RIGEL_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        };

        let log_file = env("RIGEL_LOG_FILE").or(fc.log_file).map(PathBuf::from);

        Ok(Self {
            speech,
            api_server,
            log_file,
        })
    }
}

/// Read a positive number of seconds (env > toml > default)
fn seconds<F>(env: &F, key: &str, file_value: Option<u64>, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::Config(format!("{key} {raw:?}: {e}")))?,
        None => match file_value {
            Some(secs) => secs,
            None => return Ok(default),
        },
    };

    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
