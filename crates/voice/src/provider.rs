pub(crate) mod azure;
pub(crate) mod whisper;

use std::path::Path;

use async_trait::async_trait;

use crate::{
    request::RequestContext,
    types::{LanguagePair, RecognitionResult},
};

/// A speech service able to recognize (and optionally translate) a waveform
///
/// Provider-side problems are reported as [`RecognitionResult::Failed`]
/// rather than as errors so the pipeline decides how they surface.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Recognize the speech in the waveform at `audio`
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        context: &RequestContext,
    ) -> RecognitionResult;

    /// Recognize the speech at `audio` and translate it
    async fn translate(
        &self,
        _audio: &Path,
        _languages: &LanguagePair,
        _context: &RequestContext,
    ) -> RecognitionResult {
        RecognitionResult::failed(format!("Provider '{}' does not support translation", self.name()))
    }

    /// Whether [`SpeechProvider::translate`] is implemented
    fn supports_translation(&self) -> bool {
        false
    }

    /// Get the provider name
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use axum::Router;

    use crate::request::RequestContext;

    pub(crate) fn context() -> RequestContext {
        RequestContext {
            request_id: "req-test".to_string(),
        }
    }

    /// A scratch directory holding a small waveform file
    pub(crate) fn waveform() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        (dir, path)
    }

    /// Serve `router` on an ephemeral port and return its base URL
    pub(crate) async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{address}")
    }
}
