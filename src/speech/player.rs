//! Audio playback of synthesized artifacts

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::artifact::Artifact;
use super::process;
use crate::error::PlaybackError;

/// Plays one artifact to completion on the host's output device
#[async_trait]
pub trait Player: Send + Sync {
    /// Play `artifact`, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if the artifact is not ready or the player fails
    async fn play(&self, artifact: &Artifact) -> Result<(), PlaybackError>;
}

/// Player that shells out to a command-line audio player (`aplay` by default)
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl CommandPlayer {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments placed before the artifact path
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Player for CommandPlayer {
    async fn play(&self, artifact: &Artifact) -> Result<(), PlaybackError> {
        if !artifact.is_ready() {
            return Err(PlaybackError::NotReady(artifact.id().to_string()));
        }

        tracing::debug!(artifact = %artifact.id(), program = %self.program.display(), "playing artifact");

        let args = self
            .extra_args
            .iter()
            .map(OsStr::new)
            .chain(std::iter::once(artifact.path().as_os_str()));

        let exit = process::run(&self.program, args, None).await?;
        if exit.success {
            Ok(())
        } else {
            Err(PlaybackError::ProcessFailed {
                exit_code: exit.code,
                stderr: exit.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::ArtifactStore;

    fn ready_artifact(store: &ArtifactStore) -> Artifact {
        let mut artifact = store.allocate();
        std::fs::write(artifact.path(), b"RIFF").unwrap();
        artifact.mark_ready();
        artifact
    }

    #[tokio::test]
    async fn passes_artifact_path_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let seen = dir.path().join("seen.txt");
        let script = format!(r#"printf '%s' "$1" > '{}'"#, seen.display());
        let player = CommandPlayer::new("sh")
            .with_extra_args(vec!["-c".to_string(), script, "aplay".to_string()]);
        let artifact = ready_artifact(&store);

        player.play(&artifact).await.unwrap();

        let played = std::fs::read_to_string(seen).unwrap();
        assert_eq!(Path::new(&played), artifact.path());
    }

    #[tokio::test]
    async fn refuses_unready_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let artifact = store.allocate();

        let err = CommandPlayer::new("true").play(&artifact).await.unwrap_err();
        assert!(matches!(err, PlaybackError::NotReady(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let artifact = ready_artifact(&store);

        let err = CommandPlayer::new("false").play(&artifact).await.unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::ProcessFailed {
                exit_code: Some(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_player_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let artifact = ready_artifact(&store);

        let err = CommandPlayer::new("/nonexistent/aplay")
            .play(&artifact)
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::IoFailure(_)));
    }
}
