#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod error;
mod http_client;
mod provider;
mod request;
mod service;
mod store;
mod token;
mod transcoder;
mod types;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};

pub use error::{ApiError, Result, VoiceError};
pub use provider::SpeechProvider;
pub use request::{ExtractUpload, REQUEST_ID_HEADER, RequestContext, request_id_from_headers};
pub use service::{Stage, VoiceService, VoiceServiceBuilder};
pub use store::{StagedAudio, UploadStore};
pub use token::TokenIssuer;
pub use transcoder::{CommandTranscoder, Transcoder};
pub use types::{IssuedToken, LanguagePair, RecognitionResult, UploadForm, UploadedAudio, VoiceResponse};

/// Body limit for audio uploads (32 MiB)
const BODY_LIMIT_BYTES: usize = 32 << 20;

/// Build the voice service from configuration
///
/// # Errors
///
/// Returns an error if a provider or the transcoder cannot be initialized
pub fn build_server(config: &voxgate_config::Config) -> anyhow::Result<Arc<VoiceService>> {
    let service = Arc::new(
        VoiceServiceBuilder::new(&config.voice)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize voice service: {e}"))?,
    );
    Ok(service)
}

/// Create the endpoint router for the voice API
pub fn endpoint_router() -> Router<Arc<VoiceService>> {
    Router::new()
        .route("/api/voice/upload", post(upload))
        .route("/api/voice/translate", post(translate))
        .route("/api/voice/get-speech-token", get(speech_token))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

/// Recognize an uploaded clip
async fn upload(
    State(service): State<Arc<VoiceService>>,
    ExtractUpload(context, form): ExtractUpload,
) -> std::result::Result<VoiceResponse, ApiError> {
    tracing::debug!(request_id = %context.request_id, "voice upload handler called");

    service
        .transcribe(form, &context)
        .await
        .map_err(|e| ApiError::new(e, &context, service.expose_error_details()))
}

/// Recognize and translate an uploaded clip
async fn translate(
    State(service): State<Arc<VoiceService>>,
    ExtractUpload(context, form): ExtractUpload,
) -> std::result::Result<VoiceResponse, ApiError> {
    tracing::debug!(request_id = %context.request_id, "voice translate handler called");

    service
        .translate(form, &context)
        .await
        .map_err(|e| ApiError::new(e, &context, service.expose_error_details()))
}

/// Issue a short-lived speech token for browser-side use
async fn speech_token(
    State(service): State<Arc<VoiceService>>,
    context: RequestContext,
) -> std::result::Result<Json<IssuedToken>, ApiError> {
    service
        .issue_token(&context)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, &context, service.expose_error_details()))
}
