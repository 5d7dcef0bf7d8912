//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path};

use secrecy::SecretString;
use voxgate_config::{
    Config, HealthConfig, ServerConfig, SpeechProviderConfig, SpeechProviderType, SpeechTokenConfig, TranscoderConfig,
    VoiceConfig,
};

/// Builder for constructing test configurations
///
/// Transcoding is done by `cp`, so the "waveform" handed to providers is the
/// uploaded bytes unchanged.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder staging uploads under `scratch_dir`
    pub fn new(scratch_dir: &Path) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                voice: VoiceConfig {
                    scratch_dir: scratch_dir.to_path_buf(),
                    transcoder: TranscoderConfig {
                        program: "cp".into(),
                        args: Some(vec!["{input}".to_owned(), "{output}".to_owned()]),
                        ..TranscoderConfig::default()
                    },
                    provider_timeout: "5s".to_owned(),
                    ..VoiceConfig::default()
                },
                telemetry: None,
            },
        }
    }

    /// Add a managed speech service provider pointed at a mock backend
    pub fn with_azure_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config.voice.providers.insert(
            name.to_owned(),
            SpeechProviderConfig {
                provider_type: SpeechProviderType::AzureSpeech,
                api_key: Some(SecretString::from("test-key".to_owned())),
                region: Some("testregion".to_owned()),
                base_url: Some(base_url.to_owned()),
                translator_url: Some(base_url.to_owned()),
                translator_key: None,
                translator_region: None,
                model: None,
                language: None,
            },
        );
        self
    }

    /// Add an OpenAI-compatible transcription provider pointed at a mock backend
    pub fn with_whisper_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config.voice.providers.insert(
            name.to_owned(),
            SpeechProviderConfig {
                provider_type: SpeechProviderType::Whisper,
                api_key: Some(SecretString::from("test-key".to_owned())),
                region: None,
                base_url: Some(base_url.to_owned()),
                translator_url: None,
                translator_key: None,
                translator_region: None,
                model: None,
                language: None,
            },
        );
        self
    }

    /// Route `/upload` to the named provider
    pub fn with_upload_provider(mut self, name: &str) -> Self {
        self.config.voice.upload_provider = Some(name.to_owned());
        self
    }

    /// Configure speech token credentials
    pub fn with_speech_token(mut self, key: &str, region: &str, base_url: &str) -> Self {
        self.config.voice.speech_token = Some(SpeechTokenConfig {
            subscription_key: Some(SecretString::from(key.to_owned())),
            region: Some(region.to_owned()),
            base_url: Some(base_url.to_owned()),
        });
        self
    }

    /// Replace the transcoder program
    pub fn with_transcoder_program(mut self, program: &str) -> Self {
        self.config.voice.transcoder.program = program.into();
        self
    }

    /// Return raw messages in 5xx bodies
    pub fn exposing_error_details(mut self) -> Self {
        self.config.voice.expose_error_details = true;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
