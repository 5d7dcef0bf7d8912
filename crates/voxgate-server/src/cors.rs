use http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use voxgate_config::CorsConfig;

/// Build a Tower CORS layer for the voice endpoints
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let request_id = HeaderName::from_static(voice::REQUEST_ID_HEADER);

    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, request_id.clone()])
        .expose_headers([request_id]);

    layer = if config.allows_any_origin() && !config.credentials {
        layer.allow_origin(AllowOrigin::any())
    } else {
        // Credentialed requests cannot use a wildcard, so "*" is dropped here
        let origins: Vec<HeaderValue> = config
            .origins
            .iter()
            .filter(|origin| *origin != "*")
            .filter_map(|origin| origin.parse().ok())
            .collect();

        if origins.len() < config.origins.len() {
            tracing::warn!("ignoring wildcard or unparsable CORS origins");
        }

        layer.allow_origin(origins)
    };

    if config.credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(duration) = config.max_age_duration() {
        layer = layer.max_age(duration);
    }

    layer
}
