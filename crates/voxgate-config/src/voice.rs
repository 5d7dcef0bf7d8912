use std::{path::PathBuf, time::Duration};

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Voice pipeline configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Directory that holds uploads while they are transcoded and recognized
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// External transcoder settings
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    /// Upper bound on a single provider call (e.g. "30s")
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout: String,
    /// Provider serving `/upload`, defaults to the first configured provider
    #[serde(default)]
    pub upload_provider: Option<String>,
    /// Provider serving `/translate`, defaults to the first provider able to translate
    #[serde(default)]
    pub translate_provider: Option<String>,
    /// Default language pair for `/translate`
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Return raw internal error messages to clients instead of a generic message
    #[serde(default)]
    pub expose_error_details: bool,
    /// Speech provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, SpeechProviderConfig>,
    /// Credentials for the browser token endpoint
    #[serde(default)]
    pub speech_token: Option<SpeechTokenConfig>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            transcoder: TranscoderConfig::default(),
            provider_timeout: default_provider_timeout(),
            upload_provider: None,
            translate_provider: None,
            translation: TranslationConfig::default(),
            expose_error_details: false,
            providers: IndexMap::new(),
            speech_token: None,
        }
    }
}

impl VoiceConfig {
    /// Provider call timeout as a `Duration`
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn provider_timeout_duration(&self) -> anyhow::Result<Duration> {
        parse_duration("voice.provider_timeout", &self.provider_timeout)
    }
}

/// External audio transcoder configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscoderConfig {
    /// Executable name or path
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Output sample rate, transcoder default when unset
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Output channel count, transcoder default when unset
    #[serde(default)]
    pub channels: Option<u16>,
    /// Full argument list replacing the built-in one.
    /// Must contain the `{input}` and `{output}` placeholders.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Upper bound on one conversion (e.g. "60s")
    #[serde(default = "default_transcode_timeout")]
    pub timeout: String,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            sample_rate: None,
            channels: None,
            args: None,
            timeout: default_transcode_timeout(),
        }
    }
}

impl TranscoderConfig {
    /// Conversion timeout as a `Duration`
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string cannot be parsed
    pub fn timeout_duration(&self) -> anyhow::Result<Duration> {
        parse_duration("voice.transcoder.timeout", &self.timeout)
    }
}

/// Default source and target language for translation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
        }
    }
}

/// Configuration for a single speech provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechProviderConfig {
    /// Provider type
    #[serde(rename = "type")]
    pub provider_type: SpeechProviderType,
    /// API key, or the subscription key for the managed speech service
    #[serde(default, alias = "subscription_key")]
    pub api_key: Option<SecretString>,
    /// Service region (managed speech service only)
    #[serde(default)]
    pub region: Option<String>,
    /// Base URL override for recognition/transcription
    #[serde(default)]
    pub base_url: Option<String>,
    /// Base URL override for text translation (managed speech service only)
    #[serde(default)]
    pub translator_url: Option<String>,
    /// Translator subscription key, defaults to the speech key
    #[serde(default)]
    pub translator_key: Option<SecretString>,
    /// Translator resource region, defaults to the speech region
    #[serde(default)]
    pub translator_region: Option<String>,
    /// Transcription model (direct REST transcription only)
    #[serde(default)]
    pub model: Option<String>,
    /// Recognition language for `/upload`
    #[serde(default)]
    pub language: Option<String>,
}

/// Supported speech providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProviderType {
    /// Managed cloud speech service: recognition and translation
    AzureSpeech,
    /// `OpenAI`-compatible transcription REST API
    Whisper,
}

impl SpeechProviderType {
    /// Whether providers of this type implement translation
    pub const fn supports_translation(self) -> bool {
        matches!(self, Self::AzureSpeech)
    }
}

/// Credentials for issuing short-lived speech tokens
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechTokenConfig {
    #[serde(default)]
    pub subscription_key: Option<SecretString>,
    #[serde(default)]
    pub region: Option<String>,
    /// Token endpoint base URL override
    #[serde(default)]
    pub base_url: Option<String>,
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_provider_timeout() -> String {
    "30s".to_string()
}

fn default_transcode_timeout() -> String {
    "60s".to_string()
}

fn default_source_language() -> String {
    "zh-CN".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}
