use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::assets;
use crate::config::Config;
use crate::error::GatewayError;
use crate::middleware::{allow_any_origin_on_chat, capture_inbound};
use crate::ollama::OllamaClient;
use crate::types::{ChatReply, ExchangeMetrics, InboundRequest};

pub const CHAT_PATH: &str = "/api/chat";

pub const INVALID_REQUEST_TEXT: &str = "Error: Invalid request format";

/// Per-request view of the gateway's immutable configuration
#[derive(Clone)]
pub struct AppState {
    pub ollama: Arc<OllamaClient>,
    pub max_request_bytes: usize,
}

impl AppState {
    pub fn new(ollama: OllamaClient, max_request_bytes: usize) -> Self {
        Self {
            ollama: Arc::new(ollama),
            max_request_bytes,
        }
    }
}

/// Builds the route table.
///
/// Unknown paths, and known paths hit with the wrong method, get the
/// placeholder page with a 200. Every response carries `Connection: close`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::index).fallback(assets::placeholder))
        .route("/index.html", get(assets::index).fallback(assets::placeholder))
        .route("/style.css", get(assets::stylesheet).fallback(assets::placeholder))
        .route("/script.js", get(assets::script).fallback(assets::placeholder))
        .route(CHAT_PATH, post(chat_handler).fallback(assets::placeholder))
        .fallback(assets::placeholder)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            capture_inbound,
        ))
        // Outside the body capture so its early rejections are covered too
        .layer(axum::middleware::from_fn(allow_any_origin_on_chat))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONNECTION,
            HeaderValue::from_static("close"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Writes a `{"response": "<text>"}` chat reply
pub fn chat_response(status: StatusCode, text: impl Into<String>) -> Response {
    match ChatReply::new(text).to_json() {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode chat reply: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handles `POST /api/chat`
pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(inbound): Extension<InboundRequest>,
) -> Response {
    let Some(payload) = inbound.chat_payload() else {
        tracing::warn!(
            "Rejecting chat request with unparseable body ({} bytes)",
            inbound.body.len()
        );
        return chat_response(StatusCode::BAD_REQUEST, INVALID_REQUEST_TEXT);
    };

    let start_time = tokio::time::Instant::now();
    let model = state.ollama.config().model.clone();

    let text = match state.ollama.try_generate(&payload.message).await {
        Ok(reply) => {
            let metrics = ExchangeMetrics {
                model,
                prompt_chars: payload.message.chars().count(),
                prompt_tokens: reply.usage.prompt_tokens,
                completion_tokens: reply.usage.completion_tokens,
                latency_ms: start_time.elapsed().as_millis() as u64,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };

            tracing::info!(
                "Chat exchange complete: model={}, prompt_tokens={:?}, completion_tokens={:?}, latency_ms={}",
                metrics.model,
                metrics.prompt_tokens,
                metrics.completion_tokens,
                metrics.latency_ms
            );

            if let Ok(json) = serde_json::to_string(&metrics) {
                tracing::debug!("Metrics: {}", json);
            }

            reply.text
        }
        Err(e) => {
            tracing::warn!(
                "Chat exchange failed after {}ms: {}",
                start_time.elapsed().as_millis(),
                e
            );
            e.to_reply_text()
        }
    };

    chat_response(StatusCode::OK, text)
}

/// Binds the configured address and serves until Ctrl-C or SIGTERM
pub async fn listen(config: &Config) -> Result<(), GatewayError> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| GatewayError::Bind { addr, source })?;

    let state = AppState::new(OllamaClient::new(config.ollama()), config.max_request_bytes);

    serve(listener, state, shutdown_signal()).await
}

/// Serves the gateway on an already bound listener, one task per connection
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), GatewayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    let backend = state.ollama.config();
    tracing::info!("Nova gateway listening on {}", addr);
    tracing::info!(
        "Forwarding chat to Ollama at {}:{} (model {})",
        backend.host,
        backend.port,
        backend.model
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| GatewayError::Serve { addr, source })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
