use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use voxgate_config::SpeechTokenConfig;

use crate::{
    error::{Result, VoiceError},
    http_client::http_client,
    request::RequestContext,
    types::IssuedToken,
};

/// Values shipped in sample configuration that must be replaced before use
const PLACEHOLDER_KEY: &str = "paste-your-speech-key-here";
const PLACEHOLDER_REGION: &str = "paste-your-speech-region-here";

const ISSUE_TOKEN_PATH: &str = "/sts/v1.0/issueToken";

const MISCONFIGURED_MESSAGE: &str = "You forgot to add your speech key or region to the configuration.";
const UNAUTHORIZED_MESSAGE: &str = "There was an error authorizing your speech key.";

/// Exchanges the configured subscription key for a short-lived speech token
pub struct TokenIssuer {
    client: Client,
    subscription_key: Option<SecretString>,
    region: Option<String>,
    base_url: Option<String>,
}

impl TokenIssuer {
    /// A missing configuration section behaves as missing credentials
    pub fn new(config: Option<&SpeechTokenConfig>) -> Self {
        Self {
            client: http_client(),
            subscription_key: config.and_then(|c| c.subscription_key.clone()),
            region: config.and_then(|c| c.region.clone()),
            base_url: config.and_then(|c| c.base_url.clone()),
        }
    }

    /// Credentials after presence and placeholder checks
    fn credentials(&self) -> Result<(&str, &str)> {
        let key = self
            .subscription_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY);

        let region = self
            .region
            .as_deref()
            .map(str::trim)
            .filter(|region| !region.is_empty() && *region != PLACEHOLDER_REGION);

        match (key, region) {
            (Some(key), Some(region)) => Ok((key, region)),
            _ => Err(VoiceError::MisconfiguredCredentials(MISCONFIGURED_MESSAGE.to_string())),
        }
    }

    /// Request a token with a single POST; no retries
    pub async fn issue(&self, context: &RequestContext) -> Result<IssuedToken> {
        let (key, region) = self.credentials()?;

        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{region}.api.cognitive.microsoft.com"));
        let url = format!("{}{ISSUE_TOKEN_PATH}", base_url.trim_end_matches('/'));

        tracing::debug!(request_id = %context.request_id, %region, "requesting speech token");

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", key)
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(request_id = %context.request_id, "speech token request failed: {e}");
                VoiceError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            tracing::error!(request_id = %context.request_id, "speech token endpoint rejected the key ({status})");
            return Err(VoiceError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()));
        }

        let token = response.text().await.map_err(|e| {
            tracing::error!(request_id = %context.request_id, "failed to read speech token: {e}");
            VoiceError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
        })?;

        Ok(IssuedToken {
            token,
            region: region.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use axum::{Router, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, routing::post};

    use super::*;
    use crate::provider::tests::{context, spawn_mock};

    fn issuer(key: Option<&str>, region: Option<&str>, base_url: Option<String>) -> TokenIssuer {
        let config = SpeechTokenConfig {
            subscription_key: key.map(|k| SecretString::from(k.to_string())),
            region: region.map(str::to_string),
            base_url,
        };

        TokenIssuer::new(Some(&config))
    }

    async fn issue_token(State(calls): State<Arc<AtomicU32>>, headers: HeaderMap) -> impl IntoResponse {
        calls.fetch_add(1, Ordering::SeqCst);

        match headers.get("Ocp-Apim-Subscription-Key").and_then(|v| v.to_str().ok()) {
            Some("good-key") => (StatusCode::OK, "eyJ0b2tlbiI6dHJ1ZX0").into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn token_mock() -> (String, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(ISSUE_TOKEN_PATH, post(issue_token))
            .with_state(calls.clone());

        (spawn_mock(router).await, calls)
    }

    #[tokio::test]
    async fn missing_section_is_misconfigured() {
        let err = TokenIssuer::new(None).issue(&context()).await.unwrap_err();

        assert!(matches!(err, VoiceError::MisconfiguredCredentials(_)));
        assert_eq!(err.to_string(), MISCONFIGURED_MESSAGE);
    }

    #[tokio::test]
    async fn placeholders_and_blanks_never_reach_the_network() {
        let (base_url, calls) = token_mock().await;

        let cases = [
            (Some(PLACEHOLDER_KEY), Some("westus")),
            (Some("good-key"), Some(PLACEHOLDER_REGION)),
            (Some(""), Some("westus")),
            (Some("good-key"), Some("  ")),
            (None, Some("westus")),
            (Some("good-key"), None),
        ];

        for (key, region) in cases {
            let err = issuer(key, region, Some(base_url.clone()))
                .issue(&context())
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{key:?} {region:?}");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn issues_token_for_valid_key() {
        let (base_url, calls) = token_mock().await;

        let token = issuer(Some("good-key"), Some("westus"), Some(base_url))
            .issue(&context())
            .await
            .unwrap();

        assert_eq!(
            token,
            IssuedToken {
                token: "eyJ0b2tlbiI6dHJ1ZX0".to_string(),
                region: "westus".to_string(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let (base_url, calls) = token_mock().await;

        let err = issuer(Some("bad-key"), Some("westus"), Some(base_url))
            .issue(&context())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), UNAUTHORIZED_MESSAGE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unauthorized() {
        let err = issuer(Some("good-key"), Some("westus"), Some("http://127.0.0.1:1".to_string()))
            .issue(&context())
            .await
            .unwrap_err();

        assert!(matches!(err, VoiceError::Unauthorized(_)));
    }
}
