use axum::{
    Json,
    body::Bytes,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Container extension assumed when an upload declares nothing usable
const DEFAULT_EXTENSION: &str = "webm";

/// Audio clip as received from the client
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    /// Raw container bytes
    pub bytes: Bytes,
    /// Client-side filename, if any
    pub filename: Option<String>,
    /// Declared MIME type, if any
    pub content_type: Option<String>,
}

impl UploadedAudio {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension used for the staged copy
    ///
    /// Prefers the filename's extension, then the MIME type. The result is
    /// always a short lowercase ASCII-alphanumeric token.
    pub fn extension(&self) -> String {
        let from_filename = self
            .filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| is_safe_extension(ext));

        from_filename
            .or_else(|| self.content_type.as_deref().and_then(extension_for_mime))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }
}

fn is_safe_extension(ext: &str) -> bool {
    (1..=8).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

    let ext = match essence.as_str() {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/aac" => "m4a",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => return None,
    };

    Some(ext.to_string())
}

/// Parsed multipart form for `/upload` and `/translate`
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The `file` field, absent when the client sent none
    pub audio: Option<UploadedAudio>,
    /// Recognition language override for `/upload`
    pub language: Option<String>,
    /// Source language override for `/translate`
    pub source_language: Option<String>,
    /// Target language override for `/translate`
    pub target_language: Option<String>,
}

/// Languages for a translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

/// Outcome of a single provider pass
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    /// Speech recognized; `raw` holds the provider body when it should be returned verbatim
    Recognized {
        text: String,
        raw: Option<serde_json::Value>,
    },
    /// Speech recognized and translated
    Translated { text: String, target_language: String },
    /// Speech recognized but translation did not complete
    PartialRecognitionOnly { text: String },
    /// Provider gave no usable result
    Failed { reason: String },
}

impl RecognitionResult {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self::Recognized {
            text: text.into(),
            raw: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }
}

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceResponse {
    /// `{"DisplayText": "..."}`
    DisplayText(String),
    /// Provider JSON passed through unchanged
    Raw(serde_json::Value),
}

#[derive(Serialize)]
struct DisplayTextBody<'a> {
    #[serde(rename = "DisplayText")]
    display_text: &'a str,
}

impl IntoResponse for VoiceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::DisplayText(text) => Json(DisplayTextBody { display_text: &text }).into_response(),
            Self::Raw(value) => Json(value).into_response(),
        }
    }
}

/// Short-lived speech token for browser-side SDK use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(filename: Option<&str>, content_type: Option<&str>) -> UploadedAudio {
        UploadedAudio {
            bytes: Bytes::from_static(b"RIFF"),
            filename: filename.map(str::to_string),
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn extension_prefers_filename() {
        assert_eq!(audio(Some("clip.OGG"), Some("audio/webm")).extension(), "ogg");
    }

    #[test]
    fn extension_falls_back_to_mime() {
        assert_eq!(audio(Some("blob"), Some("audio/webm;codecs=opus")).extension(), "webm");
        assert_eq!(audio(None, Some("audio/x-wav")).extension(), "wav");
    }

    #[test]
    fn hostile_filenames_are_ignored() {
        assert_eq!(audio(Some("x.../../etc/passwd"), None).extension(), "webm");
        assert_eq!(audio(Some("clip.we bm"), Some("audio/mpeg")).extension(), "mp3");
    }

    #[test]
    fn unknown_everything_defaults_to_webm() {
        assert_eq!(audio(None, Some("application/octet-stream")).extension(), "webm");
        assert_eq!(audio(None, None).extension(), "webm");
    }
}
