use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use tracing::Instrument;
use voice::{REQUEST_ID_HEADER, request_id_from_headers};

/// Assigns every request an id, runs it inside a span carrying that id and
/// echoes it back in the response headers
///
/// A usable inbound `x-request-id` is kept so callers can correlate logs.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request_id_from_headers(request.headers());

    let header_value = HeaderValue::from_str(&request_id).ok();

    // Handlers read the id from the header, so a generated one is written back
    if let Some(value) = &header_value {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri().path()
    );

    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
