use axum::{
    body::Body,
    extract::{
        FromRequest, FromRequestParts, Multipart,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};

use crate::{
    error::{ApiError, VoiceError},
    types::{UploadForm, UploadedAudio},
};

/// Header carrying the correlation id assigned by the server middleware
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request id accepted before a fresh one is generated
const MAX_REQUEST_ID_LEN: usize = 128;

/// Per-request context handed to the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id echoed in error bodies and logs
    pub request_id: String,
}

impl RequestContext {
    fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            request_id: request_id_from_headers(&parts.headers),
        }
    }
}

/// The inbound `x-request-id` when it is usable, otherwise a fresh UUID
pub fn request_id_from_headers(headers: &http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string)
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut http::request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Extractor for the multipart audio upload
///
/// A missing `file` field is not rejected here; the pipeline turns it into
/// an `InvalidInput` error so it is logged and shaped like every other failure.
pub struct ExtractUpload(pub RequestContext, pub UploadForm);

impl<S> FromRequest<S> for ExtractUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: http::Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();
        let context = RequestContext::from_parts(&parts);

        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("multipart/form-data") {
            return Err(reject(
                VoiceError::UnsupportedMediaType(
                    "Unsupported Content-Type, expected: 'Content-Type: multipart/form-data'".to_string(),
                ),
                &context,
            ));
        }

        let request = http::Request::from_parts(parts, body);

        let mut multipart = Multipart::from_request(request, state).await.map_err(|e| {
            reject(
                VoiceError::InvalidInput(format!("Failed to parse multipart form: {e}")),
                &context,
            )
        })?;

        let mut form = UploadForm::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return Err(reject(multipart_error(&e, "Failed to read multipart form"), &context)),
            };

            let field_name = field.name().unwrap_or_default().to_string();

            match field_name.as_str() {
                "file" => {
                    let filename = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| reject(multipart_error(&e, "Failed to read audio data"), &context))?;

                    form.audio = Some(UploadedAudio {
                        bytes,
                        filename,
                        content_type,
                    });
                }
                "language" => form.language = text_field(field, "language", &context).await?,
                "from" => form.source_language = text_field(field, "from", &context).await?,
                "to" => form.target_language = text_field(field, "to", &context).await?,
                _ => {
                    // Unknown fields are ignored
                }
            }
        }

        Ok(Self(context, form))
    }
}

/// Read a short text field, treating blank values as absent
async fn text_field(field: Field<'_>, name: &str, context: &RequestContext) -> Result<Option<String>, ApiError> {
    let value = field
        .text()
        .await
        .map_err(|e| reject(multipart_error(&e, &format!("Failed to read {name} field")), context))?;

    let value = value.trim();

    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Rejections are client errors, which are never scrubbed
fn reject(error: VoiceError, context: &RequestContext) -> ApiError {
    ApiError::new(error, context, false)
}

fn multipart_error(error: &MultipartError, action: &str) -> VoiceError {
    let message = format!("{action}: {error}");

    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VoiceError::PayloadTooLarge(message)
    } else {
        VoiceError::InvalidInput(message)
    }
}
