//! Rigel Voice - streaming speech playback for the Rigel kiosk assistant
//!
//! Turns a block of text into gapless spoken audio:
//! - Sentence segmentation
//! - Synthesis with an external engine (Piper) into temporary WAV files
//! - Playback with an external player (aplay), overlapped with synthesis
//!   of the next sentence
//! - An HTTP trigger (`GET /data/speak/{text}`) for the rest of the assistant
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        HTTP API  │  CLI (rigel speak)       │
//! └────────────────────┬────────────────────────┘
//!                      │ speak(text)
//! ┌────────────────────▼────────────────────────┐
//! │              PlaybackPipeline               │
//! │  Segmenter │ Synthesizer │ Player │ Store   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────┐
//! │        piper (TTS)   │   aplay (audio)      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod speech;

pub use config::Config;
pub use error::{Error, PlaybackError, Result, SpeechError, SynthesisError};
pub use speech::{
    Artifact, ArtifactStore, CommandPlayer, PiperSynthesizer, PipelineOptions, PlaybackPipeline,
    Player, Segment, SynthesisFailurePolicy, Synthesizer, TextSegmenter,
};
