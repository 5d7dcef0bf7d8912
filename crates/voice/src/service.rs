use std::{fmt, sync::Arc, time::Duration};

use secrecy::SecretString;
use voxgate_config::{SpeechProviderConfig, SpeechProviderType, TranscoderConfig, VoiceConfig};

use crate::{
    error::{Result, VoiceError},
    provider::{
        SpeechProvider,
        azure::{self, AzureSpeechProvider},
        whisper::WhisperProvider,
    },
    request::RequestContext,
    store::{StagedAudio, UploadStore},
    token::TokenIssuer,
    transcoder::{CommandTranscoder, Transcoder},
    types::{IssuedToken, LanguagePair, RecognitionResult, UploadForm, UploadedAudio, VoiceResponse},
};

/// Pipeline stages, logged as a request moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Stored,
    Transcoded,
    Recognized,
    Responded,
    Errored,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Stored => "stored",
            Self::Transcoded => "transcoded",
            Self::Recognized => "recognized",
            Self::Responded => "responded",
            Self::Errored => "errored",
        };

        f.write_str(name)
    }
}

/// Which provider operation a request runs
#[derive(Debug, Clone, Copy)]
enum Operation<'r> {
    Transcribe { language: Option<&'r str> },
    Translate { languages: &'r LanguagePair },
}

/// Sequences store, transcode and recognize for each request
pub struct VoiceService {
    store: UploadStore,
    transcoder: Arc<dyn Transcoder>,
    providers: Vec<Box<dyn SpeechProvider>>,
    upload_provider: Option<usize>,
    translate_provider: Option<usize>,
    translation: LanguagePair,
    provider_timeout: Duration,
    token_issuer: TokenIssuer,
    expose_error_details: bool,
}

impl VoiceService {
    /// Recognize the uploaded clip with the upload provider
    pub async fn transcribe(&self, form: UploadForm, context: &RequestContext) -> Result<VoiceResponse> {
        let operation = Operation::Transcribe {
            language: form.language.as_deref(),
        };

        let result = self.run(form.audio.as_ref(), context, operation).await;

        self.respond(result, context, operation)
    }

    /// Recognize the uploaded clip and translate it
    ///
    /// Languages default to the configured pair; `from`/`to` form fields
    /// override them per request.
    pub async fn translate(&self, form: UploadForm, context: &RequestContext) -> Result<VoiceResponse> {
        let languages = LanguagePair {
            source: form
                .source_language
                .unwrap_or_else(|| self.translation.source.clone()),
            target: form
                .target_language
                .unwrap_or_else(|| self.translation.target.clone()),
        };
        let operation = Operation::Translate { languages: &languages };

        let result = self.run(form.audio.as_ref(), context, operation).await;

        self.respond(result, context, operation)
    }

    /// Exchange the configured subscription key for a short-lived token
    pub async fn issue_token(&self, context: &RequestContext) -> Result<IssuedToken> {
        self.token_issuer.issue(context).await.inspect_err(|e| {
            tracing::warn!(request_id = %context.request_id, "speech token not issued: {e}");
        })
    }

    /// Whether 5xx responses carry the underlying error message
    pub fn expose_error_details(&self) -> bool {
        self.expose_error_details
    }

    /// Store, transcode and recognize, always releasing the staged files
    async fn run(
        &self,
        audio: Option<&UploadedAudio>,
        context: &RequestContext,
        operation: Operation<'_>,
    ) -> Result<RecognitionResult> {
        log_stage(context, Stage::Received);

        let audio = audio
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| VoiceError::InvalidInput("No file uploaded.".to_string()))?;

        let provider = self.provider_for(operation)?;

        let staged = self.store.store(&audio.bytes, &audio.extension()).await?;
        log_stage(context, Stage::Stored);

        let result = self.recognize(&staged, provider, context, operation).await;

        self.store.release(staged).await;

        result
    }

    async fn recognize(
        &self,
        staged: &StagedAudio,
        provider: &dyn SpeechProvider,
        context: &RequestContext,
        operation: Operation<'_>,
    ) -> Result<RecognitionResult> {
        self.transcoder.convert(staged.input(), staged.output()).await?;
        log_stage(context, Stage::Transcoded);

        let call = match operation {
            Operation::Transcribe { language } => provider.transcribe(staged.output(), language, context),
            Operation::Translate { languages } => provider.translate(staged.output(), languages, context),
        };

        let result = tokio::time::timeout(self.provider_timeout, call)
            .await
            .unwrap_or_else(|_| {
                tracing::error!(
                    request_id = %context.request_id,
                    provider = provider.name(),
                    "provider call timed out after {:?}",
                    self.provider_timeout,
                );
                RecognitionResult::failed("timeout")
            });

        log_stage(context, Stage::Recognized);

        Ok(result)
    }

    fn provider_for(&self, operation: Operation<'_>) -> Result<&dyn SpeechProvider> {
        let (index, missing) = match operation {
            Operation::Transcribe { .. } => (self.upload_provider, "no speech provider configured"),
            Operation::Translate { .. } => (self.translate_provider, "no translation-capable provider configured"),
        };

        index
            .and_then(|index| self.providers.get(index))
            .map(|provider| &**provider)
            .ok_or_else(|| VoiceError::ProviderNotFound(missing.to_string()))
    }

    fn respond(
        &self,
        result: Result<RecognitionResult>,
        context: &RequestContext,
        operation: Operation<'_>,
    ) -> Result<VoiceResponse> {
        let response = result.and_then(|result| match result {
            RecognitionResult::Recognized { raw: Some(raw), .. } => Ok(VoiceResponse::Raw(raw)),
            RecognitionResult::Recognized { text, raw: None } | RecognitionResult::Translated { text, .. } => {
                Ok(VoiceResponse::DisplayText(text))
            }
            RecognitionResult::PartialRecognitionOnly { text } => Ok(VoiceResponse::DisplayText(format!(
                "Recognized: {text}. Translation failed."
            ))),
            RecognitionResult::Failed { reason } => match operation {
                Operation::Transcribe { .. } => Err(VoiceError::RecognitionFailed(reason)),
                Operation::Translate { .. } => Err(VoiceError::TranslationFailed(reason)),
            },
        });

        match &response {
            Ok(_) => log_stage(context, Stage::Responded),
            Err(e) if e.status_code().is_server_error() => {
                tracing::error!(request_id = %context.request_id, stage = %Stage::Errored, "voice request failed: {e}");
            }
            Err(e) => {
                tracing::warn!(request_id = %context.request_id, stage = %Stage::Errored, "voice request rejected: {e}");
            }
        }

        response
    }
}

fn log_stage(context: &RequestContext, stage: Stage) {
    tracing::debug!(request_id = %context.request_id, %stage, "voice pipeline stage");
}

/// Builder for constructing the voice service from configuration
pub struct VoiceServiceBuilder<'a> {
    config: &'a VoiceConfig,
    transcoder: Option<Arc<dyn Transcoder>>,
    providers: Vec<(String, Box<dyn SpeechProvider>)>,
}

impl<'a> VoiceServiceBuilder<'a> {
    pub fn new(config: &'a VoiceConfig) -> Self {
        Self {
            config,
            transcoder: None,
            providers: Vec::new(),
        }
    }

    /// Replace the configured command transcoder
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Use `provider` instead of the configured providers
    ///
    /// Once any provider is supplied here, `voice.providers` is ignored.
    pub fn with_provider(mut self, provider: Box<dyn SpeechProvider>) -> Self {
        self.providers.push((provider.name().to_string(), provider));
        self
    }

    pub fn build(self) -> Result<VoiceService> {
        let config = self.config;

        let transcoder = match self.transcoder {
            Some(transcoder) => transcoder,
            None => Arc::new(CommandTranscoder::from_config(&transcoder_config(config))?),
        };

        let providers = if self.providers.is_empty() {
            config
                .providers
                .iter()
                .map(|(name, provider_config)| Ok((name.clone(), build_provider(name, provider_config)?)))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.providers
        };

        let upload_provider = select_provider(&providers, config.upload_provider.as_deref(), |_| true)?;
        let translate_provider = select_provider(&providers, config.translate_provider.as_deref(), |provider| {
            provider.supports_translation()
        })?;

        if let Some((name, provider)) = translate_provider.map(|index| &providers[index]) {
            if !provider.supports_translation() {
                return Err(VoiceError::ConfigError(format!("Provider '{name}' cannot translate")));
            }
        }

        let provider_timeout = config
            .provider_timeout_duration()
            .map_err(|e| VoiceError::ConfigError(e.to_string()))?;

        if providers.is_empty() {
            tracing::debug!("No speech providers configured");
        } else {
            tracing::debug!("Voice service initialized with {} provider(s)", providers.len());
        }

        Ok(VoiceService {
            store: UploadStore::new(config.scratch_dir.clone()),
            transcoder,
            providers: providers.into_iter().map(|(_, provider)| provider).collect(),
            upload_provider,
            translate_provider,
            translation: LanguagePair {
                source: config.translation.source_language.clone(),
                target: config.translation.target_language.clone(),
            },
            provider_timeout,
            token_issuer: TokenIssuer::new(config.speech_token.as_ref()),
            expose_error_details: config.expose_error_details,
        })
    }
}

/// Transcoder settings, with the waveform format pinned to what the managed
/// speech service expects when one is configured and the format is left open
fn transcoder_config(config: &VoiceConfig) -> TranscoderConfig {
    let mut transcoder = config.transcoder.clone();

    let managed_speech = config
        .providers
        .values()
        .any(|provider| provider.provider_type == SpeechProviderType::AzureSpeech);

    if managed_speech {
        transcoder.sample_rate = transcoder.sample_rate.or(Some(azure::SAMPLE_RATE));
        transcoder.channels = transcoder.channels.or(Some(azure::CHANNELS));
    }

    transcoder
}

/// Index of the named provider, or of the first one accepted by `default_filter`
fn select_provider(
    providers: &[(String, Box<dyn SpeechProvider>)],
    name: Option<&str>,
    default_filter: impl Fn(&dyn SpeechProvider) -> bool,
) -> Result<Option<usize>> {
    match name {
        Some(name) => providers
            .iter()
            .position(|(provider_name, _)| provider_name == name)
            .map(Some)
            .ok_or_else(|| VoiceError::ConfigError(format!("Provider '{name}' is not configured"))),
        None => Ok(providers.iter().position(|(_, provider)| default_filter(provider.as_ref()))),
    }
}

fn build_provider(name: &str, config: &SpeechProviderConfig) -> Result<Box<dyn SpeechProvider>> {
    tracing::debug!("Initializing speech provider: {name}");

    let api_key = resolve_api_key(name, config)?;

    let provider: Box<dyn SpeechProvider> = match config.provider_type {
        SpeechProviderType::AzureSpeech => Box::new(AzureSpeechProvider::new(
            name.to_string(),
            api_key,
            config.region.clone(),
            config.base_url.clone(),
            config.translator_url.clone(),
            config.language.clone(),
        )
        .with_translator_credentials(config.translator_key.clone(), config.translator_region.clone())),
        SpeechProviderType::Whisper => Box::new(WhisperProvider::new(
            name.to_string(),
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            config.language.clone(),
        )),
    };

    Ok(provider)
}

fn resolve_api_key(name: &str, config: &SpeechProviderConfig) -> Result<SecretString> {
    config
        .api_key
        .clone()
        .ok_or_else(|| VoiceError::ConfigError(format!("API key required for speech provider '{name}'")))
}
