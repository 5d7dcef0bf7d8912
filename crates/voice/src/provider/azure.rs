use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    http_client::http_client,
    request::RequestContext,
    types::{LanguagePair, RecognitionResult},
};

use super::SpeechProvider;

const DEFAULT_TRANSLATOR_URL: &str = "https://api.cognitive.microsofttranslator.com";
const DEFAULT_LANGUAGE: &str = "en-US";
const RECOGNITION_PATH: &str = "/speech/recognition/conversation/cognitiveservices/v1";
const WAVEFORM_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
/// Waveform format the short-audio endpoint expects, matching `WAVEFORM_CONTENT_TYPE`
pub(crate) const SAMPLE_RATE: u32 = 16_000;
pub(crate) const CHANNELS: u16 = 1;
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const SUBSCRIPTION_REGION_HEADER: &str = "Ocp-Apim-Subscription-Region";

/// Managed speech service provider
///
/// Recognition goes through the short-audio REST endpoint. Translation
/// recognizes in the source language and then sends the text to the
/// translator endpoint.
pub(crate) struct AzureSpeechProvider {
    client: Client,
    name: String,
    subscription_key: SecretString,
    speech_url: String,
    translator_url: String,
    translator_key: SecretString,
    translator_region: Option<String>,
    language: String,
}

/// Why a recognition pass produced no text
enum RecognizeFailure {
    /// The service answered but did not recognize anything
    Rejected(String),
    /// The service could not be reached
    Unreachable(String),
}

impl RecognizeFailure {
    fn into_result(self, action: &str) -> RecognitionResult {
        match self {
            Self::Rejected(reason) => RecognitionResult::failed(format!("Speech {action} failed. Reason: {reason}")),
            Self::Unreachable(e) => RecognitionResult::failed(format!("connection error: {e}")),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
}

#[derive(Deserialize)]
struct TranslatorItem {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

impl AzureSpeechProvider {
    /// Build a provider; `base_url` takes precedence over the regional endpoint
    pub fn new(
        name: String,
        subscription_key: SecretString,
        region: Option<String>,
        base_url: Option<String>,
        translator_url: Option<String>,
        language: Option<String>,
    ) -> Self {
        let speech_url = base_url
            .or_else(|| {
                region
                    .as_deref()
                    .map(|region| format!("https://{region}.stt.speech.microsoft.com"))
            })
            .unwrap_or_default();

        Self {
            client: http_client(),
            name,
            translator_key: subscription_key.clone(),
            translator_region: region,
            subscription_key,
            speech_url: speech_url.trim_end_matches('/').to_string(),
            translator_url: translator_url
                .unwrap_or_else(|| DEFAULT_TRANSLATOR_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }

    /// Use separate credentials for the translator endpoint
    ///
    /// Unset values keep the speech subscription key and region.
    pub fn with_translator_credentials(mut self, key: Option<SecretString>, region: Option<String>) -> Self {
        if let Some(key) = key {
            self.translator_key = key;
        }

        if region.is_some() {
            self.translator_region = region;
        }

        self
    }

    async fn recognize(&self, audio: &Path, language: &str) -> Result<String, RecognizeFailure> {
        let waveform = tokio::fs::read(audio)
            .await
            .map_err(|e| RecognizeFailure::Rejected(format!("could not read waveform: {e}")))?;

        tracing::debug!("Speech recognition request: {} bytes, language={language}", waveform.len());

        let response = self
            .client
            .post(format!("{}{RECOGNITION_PATH}", self.speech_url))
            .query(&[("language", language), ("format", "simple")])
            .header(SUBSCRIPTION_KEY_HEADER, self.subscription_key.expose_secret())
            .header(http::header::CONTENT_TYPE, WAVEFORM_CONTENT_TYPE)
            .header(http::header::ACCEPT, "application/json")
            .body(waveform)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Speech recognition request failed: {e}");
                RecognizeFailure::Unreachable(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Speech recognition API error ({status}): {error_text}");
            return Err(RecognizeFailure::Rejected(format!("{status} {error_text}").trim().to_string()));
        }

        let result: RecognitionResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse speech recognition response: {e}");
            RecognizeFailure::Rejected(format!("unreadable response: {e}"))
        })?;

        match (result.recognition_status.as_str(), result.display_text) {
            ("Success", Some(text)) => Ok(text),
            (status, _) => Err(RecognizeFailure::Rejected(status.to_string())),
        }
    }

    async fn translate_text(&self, text: &str, target: &str) -> Result<String, String> {
        let mut request = self
            .client
            .post(format!("{}/translate", self.translator_url))
            .query(&[("api-version", "3.0"), ("to", target)])
            .header(SUBSCRIPTION_KEY_HEADER, self.translator_key.expose_secret())
            .json(&[serde_json::json!({ "Text": text })]);

        if let Some(region) = &self.translator_region {
            request = request.header(SUBSCRIPTION_REGION_HEADER, region);
        }

        let response = request.send().await.map_err(|e| format!("connection error: {e}"))?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("{status} {error_text}").trim().to_string());
        }

        let items: Vec<TranslatorItem> = response
            .json()
            .await
            .map_err(|e| format!("unreadable response: {e}"))?;

        items
            .into_iter()
            .flat_map(|item| item.translations)
            .next()
            .map(|translation| translation.text)
            .ok_or_else(|| "no translation returned".to_string())
    }
}

#[async_trait]
impl SpeechProvider for AzureSpeechProvider {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        context: &RequestContext,
    ) -> RecognitionResult {
        let language = language.unwrap_or(self.language.as_str());

        tracing::debug!(request_id = %context.request_id, provider = %self.name, "recognizing speech");

        match self.recognize(audio, language).await {
            Ok(text) => RecognitionResult::recognized(text),
            Err(failure) => failure.into_result("recognition"),
        }
    }

    async fn translate(
        &self,
        audio: &Path,
        languages: &LanguagePair,
        context: &RequestContext,
    ) -> RecognitionResult {
        tracing::debug!(
            request_id = %context.request_id,
            provider = %self.name,
            "translating speech {} -> {}",
            languages.source,
            languages.target,
        );

        let text = match self.recognize(audio, &languages.source).await {
            Ok(text) => text,
            Err(failure) => return failure.into_result("translation"),
        };

        match self.translate_text(&text, &languages.target).await {
            Ok(translated) => RecognitionResult::Translated {
                text: translated,
                target_language: languages.target.clone(),
            },
            Err(reason) => {
                tracing::warn!(request_id = %context.request_id, "translation failed after recognition: {reason}");
                RecognitionResult::PartialRecognitionOnly { text }
            }
        }
    }

    fn supports_translation(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}
