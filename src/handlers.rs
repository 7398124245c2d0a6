use axum::{
    extract::State,
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;
use crate::cache::CacheValidator;
use crate::error::ProxyError;
use crate::request::parse_request_path;
use crate::response;
use crate::size_policy::{SizePolicy, TransformSpec};

/// Serves `/{prefix}/{size}[/watermark]/{key}`; also the router fallback, so
/// any other path gets the URL format hint.
pub async fn image_handler(
    State(app_state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match serve_image(&app_state, &uri, &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn serve_image(
    app_state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let transform = &app_state.config.transform;
    let raw_path = uri.path();

    let intent = parse_request_path(raw_path, transform.normalized_prefix())?;
    let validator = CacheValidator::for_intent(&intent, raw_path, transform.etag_scheme);

    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if validator.matches(if_none_match) {
        debug!("{} not modified", raw_path);
        return Ok(response::not_modified(&validator));
    }

    let policy = SizePolicy::resolve(&intent.size_token)?;
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let spec = TransformSpec::build(&policy, &intent.size_token, accept);

    let output = app_state.pipeline.run(&intent, &spec).await?;
    Ok(response::image(output, &validator))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
