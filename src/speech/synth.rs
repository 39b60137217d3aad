//! Text-to-speech synthesis into artifact files

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::artifact::Artifact;
use super::process;
use super::segment::Segment;
use crate::error::SynthesisError;

/// Turns one segment into a playable audio file
///
/// Implementations write to `destination.path()`. On failure they must not
/// leave a file behind that could pass for finished audio.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `segment` into `destination`
    ///
    /// # Errors
    ///
    /// Returns error if the engine is unavailable or fails
    async fn synthesize(
        &self,
        segment: &Segment,
        destination: &Artifact,
    ) -> Result<(), SynthesisError>;
}

/// Synthesizer backed by the Piper command-line engine
///
/// Invocation: `<program> [extra_args...] --model <model> --output_file <path>`
/// with the segment text on stdin.
#[derive(Debug, Clone)]
pub struct PiperSynthesizer {
    program: PathBuf,
    extra_args: Vec<String>,
    model_path: PathBuf,
}

impl PiperSynthesizer {
    /// Create a synthesizer for `program` using the voice model at `model_path`
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            model_path: model_path.into(),
        }
    }

    /// Arguments placed before the Piper flags (e.g. `-m piper` for a Python launcher)
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Engine program
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Voice model file
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn args(&self, output: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> =
            self.extra_args.iter().map(Into::into).collect();
        args.push("--model".into());
        args.push(self.model_path.clone().into_os_string());
        args.push("--output_file".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run_engine(&self, text: &str, output: &Path) -> Result<(), SynthesisError> {
        let mut payload = text.as_bytes().to_vec();
        payload.push(b'\n');

        let exit = process::run(&self.program, self.args(output), Some(&payload)).await?;
        if !exit.success {
            return Err(SynthesisError::ProcessFailed {
                exit_code: exit.code,
                stderr: exit.stderr,
            });
        }

        // A clean exit without output is still a failure
        let meta = tokio::fs::metadata(output).await?;
        if meta.len() == 0 {
            return Err(SynthesisError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "engine produced an empty audio file",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Synthesizer for PiperSynthesizer {
    async fn synthesize(
        &self,
        segment: &Segment,
        destination: &Artifact,
    ) -> Result<(), SynthesisError> {
        if !tokio::fs::try_exists(&self.model_path).await.unwrap_or(false) {
            tracing::error!(path = %self.model_path.display(), "voice model not found");
            return Err(SynthesisError::ModelMissing(self.model_path.clone()));
        }

        tracing::debug!(
            segment = segment.ordinal(),
            artifact = %destination.id(),
            "synthesizing segment"
        );

        let result = self.run_engine(segment.text(), destination.path()).await;
        if result.is_err() {
            discard_partial(destination).await;
        }
        result
    }
}

/// Remove whatever a failed run left at the artifact path
async fn discard_partial(destination: &Artifact) {
    match tokio::fs::remove_file(destination.path()).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                artifact = %destination.id(),
                path = %destination.path().display(),
                error = %e,
                "failed to remove partial synthesis output"
            );
        }
    }
}
