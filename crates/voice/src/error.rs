use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::request::RequestContext;

pub type Result<T> = std::result::Result<T, VoiceError>;

/// Voice pipeline errors with their HTTP status mapping
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Missing or empty upload
    #[error("{0}")]
    InvalidInput(String),

    /// Request body is not a multipart form
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Upload exceeds the body limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Speech key or region missing or still a placeholder
    #[error("{0}")]
    MisconfiguredCredentials(String),

    /// Provider rejected the credential while issuing a token
    #[error("{0}")]
    Unauthorized(String),

    /// Transcoder executable could not be started
    #[error("Transcoder unavailable: {0}")]
    TranscoderUnavailable(String),

    /// Transcoder ran but did not produce a waveform
    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),

    /// Provider did not recognize the audio
    #[error("{0}")]
    RecognitionFailed(String),

    /// Provider could neither recognize nor translate the audio
    #[error("{0}")]
    TranslationFailed(String),

    /// No provider configured for the requested operation
    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    /// Invalid configuration detected while building the service
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local filesystem failure while staging audio
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::MisconfiguredCredentials(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TranscoderUnavailable(_)
            | Self::TranscodeFailed(_)
            | Self::RecognitionFailed(_)
            | Self::TranslationFailed(_)
            | Self::ProviderNotFound(_)
            | Self::ConfigError(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response
    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedMediaType(_) | Self::PayloadTooLarge(_) => "invalid_request_error",
            Self::MisconfiguredCredentials(_) => "configuration_error",
            Self::Unauthorized(_) => "authentication_error",
            Self::TranscoderUnavailable(_) | Self::TranscodeFailed(_) => "transcoder_error",
            Self::RecognitionFailed(_) => "recognition_error",
            Self::TranslationFailed(_) => "translation_error",
            Self::ProviderNotFound(_) | Self::ConfigError(_) | Self::Io(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers
    ///
    /// Server-side failures collapse to a generic message unless
    /// `expose_details` is set.
    pub fn client_message(&self, expose_details: bool) -> String {
        if expose_details || !self.status_code().is_server_error() {
            return self.to_string();
        }

        "Internal server error".to_string()
    }
}

/// A `VoiceError` bound to the request it failed
#[derive(Debug)]
pub struct ApiError {
    error: VoiceError,
    request_id: Option<String>,
    expose_details: bool,
}

impl ApiError {
    pub fn new(error: VoiceError, context: &RequestContext, expose_details: bool) -> Self {
        Self {
            error,
            request_id: Some(context.request_id.clone()),
            expose_details,
        }
    }

    pub const fn error(&self) -> &VoiceError {
        &self.error
    }
}

impl From<VoiceError> for ApiError {
    fn from(error: VoiceError) -> Self {
        Self {
            error,
            request_id: None,
            expose_details: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl ErrorResponse {
    fn from_api_error(api_error: &ApiError) -> Self {
        let error = &api_error.error;

        Self {
            error: ErrorDetails {
                message: error.client_message(api_error.expose_details),
                r#type: error.error_type().to_string(),
                code: error.status_code().as_u16(),
                request_id: api_error.request_id.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error.status_code(), Json(ErrorResponse::from_api_error(&self))).into_response()
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            request_id: "req-42".to_string(),
        }
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        let cases = [
            (VoiceError::InvalidInput("No file uploaded.".into()), 400),
            (VoiceError::UnsupportedMediaType("expected multipart".into()), 415),
            (VoiceError::PayloadTooLarge("too big".into()), 413),
            (VoiceError::MisconfiguredCredentials("missing".into()), 400),
            (VoiceError::Unauthorized("rejected".into()), 401),
            (VoiceError::TranscoderUnavailable("ffmpeg".into()), 500),
            (VoiceError::TranscodeFailed("exit status: 1".into()), 500),
            (VoiceError::RecognitionFailed("NoMatch".into()), 500),
            (VoiceError::TranslationFailed("NoMatch".into()), 500),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{error:?}");
        }
    }

    #[test]
    fn server_errors_are_scrubbed_by_default() {
        let error = VoiceError::TranscodeFailed("/usr/bin/ffmpeg exited with 1".into());

        assert_eq!(error.client_message(false), "Internal server error");
        assert_eq!(
            error.client_message(true),
            "Transcoding failed: /usr/bin/ffmpeg exited with 1"
        );
    }

    #[test]
    fn client_errors_keep_their_message() {
        let error = VoiceError::InvalidInput("No file uploaded.".into());
        assert_eq!(error.client_message(false), "No file uploaded.");
    }

    #[test]
    fn error_envelope_carries_request_id() {
        let api_error = ApiError::new(
            VoiceError::RecognitionFailed("Speech recognition failed. Reason: NoMatch".into()),
            &context(),
            false,
        );

        insta::assert_json_snapshot!(ErrorResponse::from_api_error(&api_error), @r#"
        {
          "error": {
            "message": "Internal server error",
            "type": "recognition_error",
            "code": 500,
            "request_id": "req-42"
          }
        }
        "#);
    }

    #[test]
    fn envelope_without_context_omits_request_id() {
        let api_error = ApiError::from(VoiceError::Unauthorized(
            "There was an error authorizing your speech key.".into(),
        ));

        let value = serde_json::to_value(ErrorResponse::from_api_error(&api_error)).unwrap();

        assert_eq!(value["error"]["code"], 401);
        assert_eq!(
            value["error"]["message"],
            "There was an error authorizing your speech key."
        );
        assert!(value["error"].get("request_id").is_none());
    }
}
