use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::{http_client::http_client, request::RequestContext, types::RecognitionResult};

use super::SpeechProvider;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";

/// `OpenAI`-compatible transcription provider
///
/// The provider's JSON body is handed back untouched so `/upload` can return
/// it verbatim.
pub(crate) struct WhisperProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    language: Option<String>,
    name: String,
}

impl WhisperProvider {
    pub fn new(
        name: String,
        api_key: SecretString,
        base_url: Option<String>,
        model: Option<String>,
        language: Option<String>,
    ) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string());

        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language,
            name,
        }
    }
}

#[async_trait]
impl SpeechProvider for WhisperProvider {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        context: &RequestContext,
    ) -> RecognitionResult {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let waveform = match tokio::fs::read(audio).await {
            Ok(bytes) => bytes,
            Err(e) => return RecognitionResult::failed(format!("could not read waveform: {e}")),
        };

        tracing::debug!(
            request_id = %context.request_id,
            "Whisper transcription request: {} bytes, model={}",
            waveform.len(),
            self.model,
        );

        let filename = audio
            .file_name()
            .map_or_else(|| "audio.wav".to_string(), |name| name.to_string_lossy().into_owned());

        let part = match reqwest::multipart::Part::bytes(waveform)
            .file_name(filename)
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            Err(e) => return RecognitionResult::failed(format!("invalid content type: {e}")),
        };

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        if let Some(language) = language.or(self.language.as_deref()) {
            form = form.text("language", language.to_string());
        }

        let response = match self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Whisper request failed: {e}");
                return RecognitionResult::failed(format!("connection error: {e}"));
            }
        };

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Whisper API error ({status}): {error_text}");

            return RecognitionResult::failed(format!("Transcription failed ({status}): {error_text}"));
        }

        let raw: serde_json::Value = match response.json().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to parse Whisper response: {e}");
                return RecognitionResult::failed(format!("unreadable response: {e}"));
            }
        };

        let text = raw
            .get("text")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        tracing::debug!("Whisper transcription complete");

        RecognitionResult::Recognized { text, raw: Some(raw) }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
