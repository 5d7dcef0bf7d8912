//! Mock speech backend for integration tests
//!
//! Serves the recognition, translator, token and transcription endpoints a
//! voxgate provider talks to, with canned answers and call counters

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router, routing};
use tokio_util::sync::CancellationToken;

/// Subscription key the token endpoint accepts
pub const VALID_KEY: &str = "valid-key";

/// Token handed out for [`VALID_KEY`]
pub const ISSUED_TOKEN: &str = "mock-speech-token";

/// Mock speech backend that returns predictable responses
pub struct MockSpeech {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockSpeechState>,
}

struct MockSpeechState {
    recognition_count: AtomicU32,
    translation_count: AtomicU32,
    token_count: AtomicU32,
    transcription_count: AtomicU32,
    /// Recognized text; `None` answers every recognition with `NoMatch`
    transcript: Option<String>,
    /// Text returned by the translator
    translation: String,
    /// Answer translator calls with 503
    translator_down: bool,
}

impl MockSpeech {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(Some("Hello from mock speech.".to_owned()), false).await
    }

    /// Start a mock server that recognizes `transcript`
    pub async fn start_with_transcript(transcript: &str) -> anyhow::Result<Self> {
        Self::start_inner(Some(transcript.to_owned()), false).await
    }

    /// Start a mock server that recognizes nothing
    pub async fn start_no_match() -> anyhow::Result<Self> {
        Self::start_inner(None, false).await
    }

    /// Start a mock server whose translator always fails
    pub async fn start_translator_down(transcript: &str) -> anyhow::Result<Self> {
        Self::start_inner(Some(transcript.to_owned()), true).await
    }

    async fn start_inner(transcript: Option<String>, translator_down: bool) -> anyhow::Result<Self> {
        let state = Arc::new(MockSpeechState {
            recognition_count: AtomicU32::new(0),
            translation_count: AtomicU32::new(0),
            token_count: AtomicU32::new(0),
            transcription_count: AtomicU32::new(0),
            transcript,
            translation: "Hello, world.".to_owned(),
            translator_down,
        });

        let app = Router::new()
            .route(
                "/speech/recognition/conversation/cognitiveservices/v1",
                routing::post(handle_recognition),
            )
            .route("/translate", routing::post(handle_translate))
            .route("/sts/v1.0/issueToken", routing::post(handle_issue_token))
            .route("/audio/transcriptions", routing::post(handle_transcription))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for provider configuration
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recognition_count(&self) -> u32 {
        self.state.recognition_count.load(Ordering::Relaxed)
    }

    pub fn translation_count(&self) -> u32 {
        self.state.translation_count.load(Ordering::Relaxed)
    }

    pub fn token_count(&self) -> u32 {
        self.state.token_count.load(Ordering::Relaxed)
    }

    pub fn transcription_count(&self) -> u32 {
        self.state.transcription_count.load(Ordering::Relaxed)
    }

    /// Calls received on any endpoint
    pub fn total_count(&self) -> u32 {
        self.recognition_count() + self.translation_count() + self.token_count() + self.transcription_count()
    }
}

impl Drop for MockSpeech {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn has_key(headers: &HeaderMap, key: &str) -> bool {
    headers.get("Ocp-Apim-Subscription-Key").and_then(|v| v.to_str().ok()) == Some(key)
}

async fn handle_recognition(
    State(state): State<Arc<MockSpeechState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.recognition_count.fetch_add(1, Ordering::Relaxed);

    if !has_key(&headers, "test-key") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty audio").into_response();
    }

    match &state.transcript {
        Some(text) => Json(serde_json::json!({
            "RecognitionStatus": "Success",
            "DisplayText": text,
            "Offset": 0,
            "Duration": 12_000_000,
        }))
        .into_response(),
        None => Json(serde_json::json!({ "RecognitionStatus": "NoMatch" })).into_response(),
    }
}

async fn handle_translate(State(state): State<Arc<MockSpeechState>>) -> impl IntoResponse {
    state.translation_count.fetch_add(1, Ordering::Relaxed);

    if state.translator_down {
        return (StatusCode::SERVICE_UNAVAILABLE, "translator unavailable").into_response();
    }

    Json(serde_json::json!([
        { "translations": [{ "text": state.translation, "to": "en" }] }
    ]))
    .into_response()
}

async fn handle_issue_token(State(state): State<Arc<MockSpeechState>>, headers: HeaderMap) -> impl IntoResponse {
    state.token_count.fetch_add(1, Ordering::Relaxed);

    if has_key(&headers, VALID_KEY) {
        (StatusCode::OK, ISSUED_TOKEN).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Access denied due to invalid subscription key.").into_response()
    }
}

async fn handle_transcription(State(state): State<Arc<MockSpeechState>>, mut multipart: Multipart) -> impl IntoResponse {
    state.transcription_count.fetch_add(1, Ordering::Relaxed);

    let mut model = String::new();
    let mut file_bytes = 0;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "model" => model = field.text().await.unwrap_or_default(),
            "file" => file_bytes = field.bytes().await.map(|b| b.len()).unwrap_or_default(),
            _ => {}
        }
    }

    Json(serde_json::json!({
        "text": state.transcript.clone().unwrap_or_default(),
        "model": model,
        "file_bytes": file_bytes,
    }))
}
