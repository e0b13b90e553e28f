use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body_util::{BodyExt, Limited};

use crate::gateway::{chat_response, AppState, CHAT_PATH, INVALID_REQUEST_TEXT};
use crate::types::InboundRequest;

/// Adds `Access-Control-Allow-Origin: *` to every response on the chat path
pub async fn allow_any_origin_on_chat(req: Request, next: Next) -> Response {
    let is_chat = req.uri().path() == CHAT_PATH;

    let mut response = next.run(req).await;
    if is_chat {
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }
    response
}

/// Reads the whole request body, records it as an [`InboundRequest`], then
/// reconstructs the body so handlers can still read it.
///
/// The HTTP/1.1 server has already scanned the header block; the body read is
/// bounded by the request's Content-Length and by the configured maximum.
pub async fn capture_inbound(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let collected = match Limited::new(body, state.max_request_bytes).collect().await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read request body: {}", e);
            let status = if e.is::<http_body_util::LengthLimitError>() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            return chat_response(status, INVALID_REQUEST_TEXT);
        }
    };

    let body_bytes = collected.to_bytes();

    tracing::debug!(
        method = %parts.method,
        path = parts.uri.path(),
        body_len = body_bytes.len(),
        "Captured inbound request"
    );

    parts.extensions.insert(InboundRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        headers: parts.headers.clone(),
        body: body_bytes.clone(),
    });

    next.run(Request::from_parts(parts, Body::from(body_bytes))).await
}
