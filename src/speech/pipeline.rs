//! Streaming speech playback
//!
//! Text is split into segments; segment 0 is synthesized up front, then each
//! further segment is synthesized in a background task while the previous
//! one plays. At most one synthesis and one playback are in flight, segments
//! play in order, and every artifact is released before `speak` returns.
//!
//! ```text
//!  Segmenting ──► Priming ──► Streaming ──► Draining ──► Done
//!      │             │            │             │
//!      └─► Done      └────────────┴─────────────┴──► Failed
//!    (nothing to
//!      speak)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;

use super::artifact::{Artifact, ArtifactStore};
use super::player::Player;
use super::segment::{Segment, TextSegmenter};
use super::synth::Synthesizer;
use crate::error::{PlaybackError, SpeechError, SynthesisError};

/// Default ceiling for one synthesis call
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Default ceiling for one playback call
pub const DEFAULT_PLAYBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// What to do when a prefetched segment fails to synthesize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisFailurePolicy {
    /// Let the segment that is already playing finish, then fail
    #[default]
    FinishCurrent,
    /// Cut the current playback short and fail immediately
    Abort,
}

impl SynthesisFailurePolicy {
    /// Parse a policy name (`finish-current` or `abort`)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finish-current" | "finish_current" | "finish" => Some(Self::FinishCurrent),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Tunables for a pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub synthesis_timeout: Duration,
    pub playback_timeout: Duration,
    pub on_synthesis_failure: SynthesisFailurePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            playback_timeout: DEFAULT_PLAYBACK_TIMEOUT,
            on_synthesis_failure: SynthesisFailurePolicy::default(),
        }
    }
}

/// Phase of one `speak` run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Segmenting,
    Priming,
    Streaming,
    Draining,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Segmenting => "segmenting",
            Self::Priming => "priming",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bookkeeping for a single `speak` invocation
#[derive(Debug)]
struct PipelineRun {
    state: PipelineState,
    segments: usize,
    playing: Option<usize>,
    synthesizing: Option<usize>,
}

impl PipelineRun {
    const fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            segments: 0,
            playing: None,
            synthesizing: None,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(from = %self.state, to = %state, "speech pipeline transition");
        self.state = state;
    }
}

/// A segment whose audio is on disk and ready to play
struct Prepared {
    index: usize,
    artifact: Artifact,
}

/// Segments text, synthesizes ahead and plays back without gaps
pub struct PlaybackPipeline {
    segmenter: TextSegmenter,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    store: ArtifactStore,
    options: PipelineOptions,
}

impl fmt::Debug for PlaybackPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackPipeline")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PlaybackPipeline {
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn Player>,
        store: ArtifactStore,
        options: PipelineOptions,
    ) -> Self {
        Self {
            segmenter: TextSegmenter::new(),
            synthesizer,
            player,
            store,
            options,
        }
    }

    /// Artifact store backing this pipeline
    #[must_use]
    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Speak `text`, returning once the last segment has played
    ///
    /// Text with nothing speakable in it succeeds without synthesizing.
    ///
    /// # Errors
    ///
    /// Returns the first synthesis or playback failure. Audio for the
    /// segments before the failure has already been played, and all
    /// artifacts are released by the time the error is returned.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let mut run = PipelineRun::new();

        run.enter(PipelineState::Segmenting);
        let segments = self.segmenter.split(text);
        run.segments = segments.len();

        if segments.is_empty() {
            tracing::info!("nothing to speak");
            run.enter(PipelineState::Done);
            return Ok(());
        }

        tracing::info!(segments = run.segments, "speaking");

        let result = self.stream(&mut run, segments).await;
        match &result {
            Ok(()) => {
                run.enter(PipelineState::Done);
                tracing::info!(segments = run.segments, "speech complete");
            }
            Err(e) => {
                run.enter(PipelineState::Failed);
                tracing::error!(
                    error = %e,
                    segments = run.segments,
                    playing = ?run.playing.map(|i| i + 1),
                    synthesizing = ?run.synthesizing.map(|i| i + 1),
                    "speech failed"
                );
            }
        }
        result
    }

    async fn stream(
        &self,
        run: &mut PipelineRun,
        segments: Vec<Segment>,
    ) -> Result<(), SpeechError> {
        let mut segments = segments.into_iter();
        let Some(first) = segments.next() else {
            return Ok(());
        };

        run.enter(PipelineState::Priming);
        run.synthesizing = Some(first.index());
        let mut current = synthesize(
            Arc::clone(&self.synthesizer),
            first,
            self.store.allocate(),
            self.options.synthesis_timeout,
        )
        .await?;

        run.enter(PipelineState::Streaming);
        for segment in segments {
            run.playing = Some(current.index);
            run.synthesizing = Some(segment.index());

            let pending = tokio::spawn(synthesize(
                Arc::clone(&self.synthesizer),
                segment,
                self.store.allocate(),
                self.options.synthesis_timeout,
            ));

            let step = self.play_alongside(&current, pending).await;
            self.store.release(current.artifact);
            current = step?;
        }

        run.enter(PipelineState::Draining);
        run.playing = Some(current.index);
        run.synthesizing = None;
        let played = self.play(&current).await;
        self.store.release(current.artifact);
        played.map_err(Into::into)
    }

    /// Play `current` while `pending` synthesizes the next segment
    ///
    /// Never returns before both have finished.
    async fn play_alongside(
        &self,
        current: &Prepared,
        mut pending: JoinHandle<Result<Prepared, SynthesisError>>,
    ) -> Result<Prepared, SpeechError> {
        match self.options.on_synthesis_failure {
            SynthesisFailurePolicy::FinishCurrent => {
                let played = self.play(current).await;
                let prefetched = join(pending).await;
                settle(played, prefetched)
            }
            SynthesisFailurePolicy::Abort => {
                let playback = self.play(current);
                tokio::pin!(playback);

                tokio::select! {
                    played = &mut playback => {
                        let prefetched = join(pending).await;
                        settle(played, prefetched)
                    }
                    joined = &mut pending => {
                        match flatten(joined) {
                            Ok(next) => settle(playback.await, Ok(next)),
                            Err(e) => {
                                tracing::warn!(
                                    segment = current.index + 1,
                                    "interrupting playback after synthesis failure"
                                );
                                Err(e.into())
                            }
                        }
                    }
                }
            }
        }
    }

    async fn play(&self, prepared: &Prepared) -> Result<(), PlaybackError> {
        let limit = self.options.playback_timeout;
        let result = tokio::time::timeout(limit, self.player.play(&prepared.artifact))
            .await
            .unwrap_or_else(|_| Err(PlaybackError::Timeout(limit)));

        if let Err(e) = &result {
            tracing::error!(segment = prepared.index + 1, error = %e, "playback failed");
        }
        result
    }
}

/// Synthesize `segment` into `artifact` under a deadline
///
/// On failure the artifact is dropped here, which removes anything written.
async fn synthesize(
    synthesizer: Arc<dyn Synthesizer>,
    segment: Segment,
    mut artifact: Artifact,
    limit: Duration,
) -> Result<Prepared, SynthesisError> {
    let result = tokio::time::timeout(limit, synthesizer.synthesize(&segment, &artifact))
        .await
        .unwrap_or_else(|_| Err(SynthesisError::Timeout(limit)));

    match result {
        Ok(()) => {
            artifact.mark_ready();
            Ok(Prepared {
                index: segment.index(),
                artifact,
            })
        }
        Err(e) => {
            tracing::error!(segment = segment.ordinal(), error = %e, "synthesis failed");
            Err(e)
        }
    }
}

async fn join(
    pending: JoinHandle<Result<Prepared, SynthesisError>>,
) -> Result<Prepared, SynthesisError> {
    flatten(pending.await)
}

fn flatten(
    joined: Result<Result<Prepared, SynthesisError>, tokio::task::JoinError>,
) -> Result<Prepared, SynthesisError> {
    joined.unwrap_or_else(|e| {
        Err(SynthesisError::IoFailure(std::io::Error::other(format!(
            "synthesis task failed: {e}"
        ))))
    })
}

/// Combine the outcome of one streaming step
///
/// Playback failure wins; a prefetched artifact is released on the way out.
fn settle(
    played: Result<(), PlaybackError>,
    prefetched: Result<Prepared, SynthesisError>,
) -> Result<Prepared, SpeechError> {
    match (played, prefetched) {
        (Ok(()), Ok(next)) => Ok(next),
        (Err(e), _) => Err(e.into()),
        (Ok(()), Err(e)) => Err(e.into()),
    }
}
