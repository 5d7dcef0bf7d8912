use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Result, VoiceError};

/// Extension of every transcoded waveform
const WAVEFORM_EXTENSION: &str = "wav";

/// Scratch directory holding uploads while a request is in flight
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

/// An upload written to disk together with the path its waveform will take
///
/// Both files share one generated id. Dropping the handle without calling
/// [`UploadStore::release`] still removes them, so a cancelled request
/// leaves nothing behind.
#[derive(Debug)]
pub struct StagedAudio {
    id: Uuid,
    input: PathBuf,
    output: PathBuf,
    released: bool,
}

impl StagedAudio {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the upload as received
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path the transcoder writes the waveform to
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed abandoned upload file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "failed to remove abandoned upload file: {e}"),
            }
        }
    }
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to a fresh uniquely named file
    ///
    /// Empty input is rejected before the filesystem is touched.
    pub async fn store(&self, bytes: &[u8], extension: &str) -> Result<StagedAudio> {
        if bytes.is_empty() {
            return Err(VoiceError::InvalidInput("No file uploaded.".to_string()));
        }

        tokio::fs::create_dir_all(&self.root).await?;

        let id = Uuid::new_v4();
        let input = self.root.join(format!("{id}.{extension}"));
        let output = self.root.join(format!("{id}.{WAVEFORM_EXTENSION}"));

        // A `.wav` upload would otherwise share its path with the waveform
        let output = if input == output {
            self.root.join(format!("{id}.out.{WAVEFORM_EXTENSION}"))
        } else {
            output
        };

        let staged = StagedAudio {
            id,
            input,
            output,
            released: false,
        };

        tracing::debug!(path = %staged.input.display(), bytes = bytes.len(), "saving upload");

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged.input)
            .await?;

        // On failure `staged` is dropped and removes the partial file
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(staged)
    }

    /// Remove both files of a staged upload
    pub async fn release(&self, mut staged: StagedAudio) {
        tracing::debug!(id = %staged.id, "cleaning up files");

        Self::delete(&staged.input).await;
        Self::delete(&staged.output).await;

        staged.released = true;
    }

    /// Best-effort removal; failures are logged and swallowed
    pub async fn delete(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "failed to delete temporary file: {e}"),
        }
    }
}
