//! Stand-in for a local Ollama install: answers `/api/generate` by echoing the prompt.
use axum::{
    body::Body,
    extract::Json,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(default = "default_stream")]
    stream: bool,
}

fn default_stream() -> bool {
    true
}

#[derive(Serialize)]
struct GenerateChunk {
    model: String,
    created_at: String,
    response: String,
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_eval_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eval_count: Option<u32>,
}

async fn generate(Json(req): Json<GenerateRequest>) -> Response {
    tracing::info!(
        "Mock Ollama: model={}, stream={}, prompt={:?}",
        req.model,
        req.stream,
        req.prompt
    );

    let reply = format!("Echo: {}", req.prompt);
    let words: Vec<String> = reply.split_inclusive(' ').map(str::to_string).collect();
    let prompt_tokens = req.prompt.split_whitespace().count() as u32;

    if !req.stream {
        return Json(GenerateChunk {
            model: req.model,
            created_at: chrono::Utc::now().to_rfc3339(),
            response: reply,
            done: true,
            prompt_eval_count: Some(prompt_tokens),
            eval_count: Some(words.len() as u32),
        })
        .into_response();
    }

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(32);

    tokio::spawn(async move {
        for word in &words {
            sleep(Duration::from_millis(10)).await;

            let chunk = GenerateChunk {
                model: req.model.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
                response: word.clone(),
                done: false,
                prompt_eval_count: None,
                eval_count: None,
            };

            if let Ok(json) = serde_json::to_string(&chunk) {
                let _ = tx.send(Ok(format!("{}\n", json))).await;
            }
        }

        let final_chunk = GenerateChunk {
            model: req.model.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            response: String::new(),
            done: true,
            prompt_eval_count: Some(prompt_tokens),
            eval_count: Some(words.len() as u32),
        };

        if let Ok(json) = serde_json::to_string(&final_chunk) {
            let _ = tx.send(Ok(format!("{}\n", json))).await;
        }
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("MOCK_OLLAMA_ADDR").unwrap_or_else(|_| "127.0.0.1:11434".to_string());

    let app = Router::new().route("/api/generate", post(generate));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind mock Ollama");
    tracing::info!("Mock Ollama listening on {}", addr);

    axum::serve(listener, app).await.expect("Mock Ollama failed");
}
