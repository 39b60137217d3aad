//! Shared test utilities
//!
//! Recording doubles for the synthesizer and player. Both log what they were
//! asked to do so tests can check ordering, concurrency and cleanup.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rigel_voice::{
    Artifact, ArtifactStore, PipelineOptions, PlaybackError, PlaybackPipeline, Player, Segment,
    SynthesisError, Synthesizer,
};

/// Something a double observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SynthStart(usize),
    SynthEnd(usize),
    PlayStart(usize),
    PlayEnd(usize),
}

/// Shared log of everything the doubles saw
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    texts: Mutex<Vec<String>>,
    paths: Mutex<HashMap<String, (usize, PathBuf)>>,
    synth_in_flight: AtomicUsize,
    max_synth_in_flight: AtomicUsize,
    play_in_flight: AtomicUsize,
    max_play_in_flight: AtomicUsize,
    max_live: AtomicUsize,
    stale_artifacts: AtomicUsize,
}

impl Recorder {
    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// Indices played, in start order
    pub fn played(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PlayStart(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Indices whose playback ran to completion
    pub fn finished(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PlayEnd(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn synthesized(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::SynthStart(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Position of `event` in the log
    pub fn position(&self, event: Event) -> usize {
        self.events()
            .iter()
            .position(|e| *e == event)
            .unwrap_or_else(|| panic!("{event:?} never happened"))
    }

    pub fn max_synth_in_flight(&self) -> usize {
        self.max_synth_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_play_in_flight(&self) -> usize {
        self.max_play_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Times a player found the previous segment's file still on disk
    pub fn stale_artifacts(&self) -> usize {
        self.stale_artifacts.load(Ordering::SeqCst)
    }

    fn remember(&self, artifact: &Artifact, index: usize) {
        self.paths
            .lock()
            .unwrap()
            .insert(artifact.id().to_string(), (index, artifact.path().to_path_buf()));
    }

    fn index_of(&self, artifact: &Artifact) -> usize {
        self.paths.lock().unwrap()[artifact.id()].0
    }

    fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.paths
            .lock()
            .unwrap()
            .values()
            .find(|(i, _)| *i == index)
            .map(|(_, p)| p.clone())
    }
}

/// Decrements an in-flight counter even if the future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// How a double behaves for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fail,
    Hang,
}

/// Synthesizer double that writes a fake WAV after a delay
#[derive(Debug)]
pub struct MockSynthesizer {
    recorder: Arc<Recorder>,
    delay: Duration,
    faults: HashMap<usize, Fault>,
}

impl MockSynthesizer {
    pub fn new(recorder: Arc<Recorder>, delay: Duration) -> Self {
        Self {
            recorder,
            delay,
            faults: HashMap::new(),
        }
    }

    pub fn with_fault(mut self, index: usize, fault: Fault) -> Self {
        self.faults.insert(index, fault);
        self
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        segment: &Segment,
        destination: &Artifact,
    ) -> Result<(), SynthesisError> {
        let index = segment.index();
        let _guard = InFlight::enter(
            &self.recorder.synth_in_flight,
            &self.recorder.max_synth_in_flight,
        );
        self.recorder.push(Event::SynthStart(index));
        self.recorder.remember(destination, index);
        self.recorder
            .texts
            .lock()
            .unwrap()
            .push(segment.text().to_string());

        match self.faults.get(&index) {
            Some(Fault::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Some(Fault::Fail) => {
                tokio::time::sleep(self.delay).await;
                self.recorder.push(Event::SynthEnd(index));
                return Err(SynthesisError::ProcessFailed {
                    exit_code: Some(1),
                    stderr: "mock failure".to_string(),
                });
            }
            None => tokio::time::sleep(self.delay).await,
        }

        std::fs::write(destination.path(), b"RIFF....WAVE")?;
        self.recorder.push(Event::SynthEnd(index));
        Ok(())
    }
}

/// Player double that "plays" for a fixed time
#[derive(Debug)]
pub struct MockPlayer {
    recorder: Arc<Recorder>,
    store: ArtifactStore,
    delay: Duration,
    faults: HashMap<usize, Fault>,
}

impl MockPlayer {
    pub fn new(recorder: Arc<Recorder>, store: ArtifactStore, delay: Duration) -> Self {
        Self {
            recorder,
            store,
            delay,
            faults: HashMap::new(),
        }
    }

    pub fn with_fault(mut self, index: usize, fault: Fault) -> Self {
        self.faults.insert(index, fault);
        self
    }
}

#[async_trait]
impl Player for MockPlayer {
    async fn play(&self, artifact: &Artifact) -> Result<(), PlaybackError> {
        assert!(artifact.is_ready(), "played an artifact before it was ready");
        assert!(artifact.path().exists(), "ready artifact has no file");

        let index = self.recorder.index_of(artifact);
        let _guard = InFlight::enter(
            &self.recorder.play_in_flight,
            &self.recorder.max_play_in_flight,
        );
        self.recorder.push(Event::PlayStart(index));
        self.recorder
            .max_live
            .fetch_max(self.store.live(), Ordering::SeqCst);

        if index > 0 {
            if let Some(previous) = self.recorder.path_of(index - 1) {
                if previous.exists() {
                    self.recorder.stale_artifacts.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        match self.faults.get(&index) {
            Some(Fault::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Some(Fault::Fail) => {
                return Err(PlaybackError::ProcessFailed {
                    exit_code: Some(1),
                    stderr: "mock failure".to_string(),
                });
            }
            None => tokio::time::sleep(self.delay).await,
        }

        self.recorder.push(Event::PlayEnd(index));
        Ok(())
    }
}

/// A pipeline wired to recording doubles
pub struct Harness {
    pub recorder: Arc<Recorder>,
    pub store: ArtifactStore,
    pub pipeline: Arc<PlaybackPipeline>,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Build a harness; the closures may add faults to the doubles
    pub fn new(
        options: PipelineOptions,
        synth: impl FnOnce(MockSynthesizer) -> MockSynthesizer,
        player: impl FnOnce(MockPlayer) -> MockPlayer,
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = ArtifactStore::new(dir.path().join("speech")).expect("failed to create store");
        let recorder = Arc::new(Recorder::default());

        let synthesizer = synth(MockSynthesizer::new(
            Arc::clone(&recorder),
            Duration::from_millis(20),
        ));
        let player = player(MockPlayer::new(
            Arc::clone(&recorder),
            store.clone(),
            Duration::from_millis(40),
        ));

        let pipeline = Arc::new(PlaybackPipeline::new(
            Arc::new(synthesizer),
            Arc::new(player),
            store.clone(),
            options,
        ));

        Self {
            recorder,
            store,
            pipeline,
            _dir: dir,
        }
    }

    /// Harness with default options and well-behaved doubles
    pub fn healthy() -> Self {
        Self::new(PipelineOptions::default(), |s| s, |p| p)
    }

    /// Assert every allocated artifact was released and no files remain
    pub fn assert_clean(&self) {
        assert_eq!(
            self.store.allocated(),
            self.store.released(),
            "artifact leak"
        );
        assert_eq!(self.store.live(), 0);
        let leftover = std::fs::read_dir(self.store.dir())
            .expect("store dir missing")
            .count();
        assert_eq!(leftover, 0, "files left in artifact dir");
    }
}

/// Options with short deadlines for timeout tests
pub fn short_deadlines() -> PipelineOptions {
    PipelineOptions {
        synthesis_timeout: Duration::from_millis(200),
        playback_timeout: Duration::from_millis(200),
        ..PipelineOptions::default()
    }
}
