//! Streaming speech synthesis and playback
//!
//! Text goes through [`TextSegmenter`], each segment is synthesized by a
//! [`Synthesizer`] into an [`Artifact`] and played by a [`Player`].
//! [`PlaybackPipeline`] overlaps synthesis of the next segment with
//! playback of the current one.

mod artifact;
mod pipeline;
mod player;
mod process;
mod segment;
mod synth;

pub use artifact::{Artifact, ArtifactStore};
pub use pipeline::{
    DEFAULT_PLAYBACK_TIMEOUT, DEFAULT_SYNTHESIS_TIMEOUT, PipelineOptions, PipelineState,
    PlaybackPipeline, SynthesisFailurePolicy,
};
pub use player::{CommandPlayer, Player};
pub use segment::{Segment, TextSegmenter, clean_text};
pub use synth::{PiperSynthesizer, Synthesizer};
