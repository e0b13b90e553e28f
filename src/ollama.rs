use axum::http::{header, Method, Request};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use crate::config::OllamaConfig;
use crate::error::BackendError;
use crate::parsers::OllamaParser;
use crate::types::{GenerationRequest, GenerationResponse};

const GENERATE_PATH: &str = "/api/generate";

/// Client for Ollama's generate endpoint.
///
/// Holds configuration only. Each call dials a fresh connection and drops it
/// before returning.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Generates a reply for `prompt`, folding any failure into `Error: ...` text
    pub async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(reply) => reply.text,
            Err(e) => e.to_reply_text(),
        }
    }

    /// Runs one generate call against Ollama
    pub async fn try_generate(&self, prompt: &str) -> Result<GenerationResponse, BackendError> {
        let deadline = Instant::now() + self.config.timeout;
        let timeout_err = BackendError::Timeout {
            secs: self.config.timeout.as_secs(),
        };

        let stream = match timeout_at(
            deadline,
            TcpStream::connect((self.config.host.as_str(), self.config.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Failed to connect to Ollama at {}:{}: {}",
                    self.config.host,
                    self.config.port,
                    e
                );
                return Err(BackendError::Unreachable {
                    port: self.config.port,
                });
            }
            Err(_) => {
                tracing::warn!("Timed out connecting to Ollama");
                return Err(BackendError::Unreachable {
                    port: self.config.port,
                });
            }
        };

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| {
                tracing::error!("HTTP handshake with Ollama failed: {}", e);
                BackendError::Send
            })?;

        // Owns the socket; aborting it on drop closes the connection on every path
        let conn_task = ConnectionTask(tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("Ollama connection closed with error: {}", e);
            }
        }));

        let request = self.build_request(prompt)?;

        let exchange = async {
            let response = sender
                .send_request(request)
                .await
                .map_err(classify_exchange_error)?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!("Ollama answered with status {}", status);
            }

            let mut body = response.into_body();
            let mut parser = OllamaParser::new();

            while let Some(frame) = body.frame().await {
                let frame = frame.map_err(|e| {
                    tracing::error!("Error reading Ollama body: {}", e);
                    BackendError::Receive
                })?;
                if let Ok(data) = frame.into_data() {
                    parser.feed_chunk(&data);
                }
            }

            parser.finalize()
        };

        let result = match timeout_at(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Timed out waiting for Ollama");
                Err(timeout_err)
            }
        };

        drop(sender);
        drop(conn_task);

        result
    }

    fn build_request(&self, prompt: &str) -> Result<Request<Full<Bytes>>, BackendError> {
        let body = serde_json::to_vec(&GenerationRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        })
        .map_err(|e| {
            tracing::error!("Failed to encode generate request: {}", e);
            BackendError::Send
        })?;

        Request::builder()
            .method(Method::POST)
            .uri(GENERATE_PATH)
            .header(header::HOST, format!("{}:{}", self.config.host, self.config.port))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .header(header::CONNECTION, "close")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| {
                tracing::error!("Failed to build generate request: {}", e);
                BackendError::Send
            })
    }
}

/// Maps a failed request/response-head exchange onto the backend error taxonomy.
///
/// The request was written by the time hyper reports a parse error or an
/// early close; both mean Ollama sent nothing usable back.
fn classify_exchange_error(e: hyper::Error) -> BackendError {
    if e.is_parse() || e.is_incomplete_message() {
        tracing::error!("Ollama sent no valid response head: {}", e);
        BackendError::Protocol
    } else {
        tracing::error!("Failed to send request to Ollama: {}", e);
        BackendError::Send
    }
}

struct ConnectionTask(JoinHandle<()>);

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
