use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, a route names an
    /// unknown or incapable provider, or a timeout is malformed
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_routes()?;
        self.validate_transcoder()?;
        self.voice.provider_timeout_duration()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.voice.providers.is_empty() {
            anyhow::bail!("at least one speech provider must be configured under [voice.providers]");
        }

        for (name, provider) in &self.voice.providers {
            if provider.provider_type == crate::SpeechProviderType::AzureSpeech
                && provider.region.is_none()
                && provider.base_url.is_none()
            {
                anyhow::bail!("speech provider '{name}' needs either a region or a base_url");
            }
        }

        let managed_speech = self
            .voice
            .providers
            .values()
            .any(|provider| provider.provider_type == crate::SpeechProviderType::AzureSpeech);
        let transcoder = &self.voice.transcoder;

        if managed_speech
            && (transcoder.sample_rate.is_some_and(|rate| rate != 16_000)
                || transcoder.channels.is_some_and(|channels| channels != 1))
        {
            anyhow::bail!("azure_speech providers need 16000 Hz mono audio; fix voice.transcoder sample_rate/channels");
        }

        Ok(())
    }

    fn validate_routes(&self) -> anyhow::Result<()> {
        let voice = &self.voice;

        if let Some(ref name) = voice.upload_provider
            && !voice.providers.contains_key(name)
        {
            anyhow::bail!("voice.upload_provider '{name}' is not a configured provider");
        }

        if let Some(ref name) = voice.translate_provider {
            let Some(provider) = voice.providers.get(name) else {
                anyhow::bail!("voice.translate_provider '{name}' is not a configured provider");
            };

            if !provider.provider_type.supports_translation() {
                anyhow::bail!("voice.translate_provider '{name}' does not support translation");
            }
        }

        Ok(())
    }

    fn validate_transcoder(&self) -> anyhow::Result<()> {
        let transcoder = &self.voice.transcoder;

        transcoder.timeout_duration()?;

        if let Some(ref args) = transcoder.args {
            for placeholder in ["{input}", "{output}"] {
                if !args.iter().any(|arg| arg.contains(placeholder)) {
                    anyhow::bail!("voice.transcoder.args must contain the {placeholder} placeholder");
                }
            }
        }

        Ok(())
    }
}
