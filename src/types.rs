use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Request captured off the client connection before routing
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    /// Parses the body as a chat payload; any structural mismatch is a failure
    pub fn chat_payload(&self) -> Option<ChatPayload> {
        serde_json::from_slice::<ChatPayload>(&self.body).ok()
    }
}

/// Body of `POST /api/chat`
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChatPayload {
    pub message: String,
}

/// Envelope written back to the browser for every chat request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    /// Encodes as `{"response": "<text>"}`, with a space after the colon
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }
}

/// Compact JSON with `": "` between keys and values
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Body sent to Ollama's `/api/generate`
#[derive(Debug, Serialize)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Token usage information
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Everything read back from one generate call
#[derive(Clone, Debug)]
pub struct GenerationResponse {
    pub raw: Bytes,
    pub text: String,
    pub usage: TokenUsage,
}

/// One Ollama generate object; a full reply when `stream` is false, a line of NDJSON otherwise
#[derive(Debug, Deserialize)]
pub struct OllamaGenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Completion record logged for a single chat exchange
#[derive(Clone, Debug, Serialize)]
pub struct ExchangeMetrics {
    pub model: String,
    pub prompt_chars: usize,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub latency_ms: u64,
    pub timestamp: String,
}
