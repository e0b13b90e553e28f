use bytes::BytesMut;

use crate::error::BackendError;
use crate::types::{GenerationResponse, OllamaGenerateChunk, TokenUsage};

/// Accumulates an Ollama `/api/generate` body and pulls the generated text out of it.
///
/// Accepts both the single JSON object returned when `stream` is false and
/// Ollama's NDJSON stream, whose `response` fragments are concatenated.
#[derive(Default)]
pub struct OllamaParser {
    raw: BytesMut,
    pending: BytesMut,
    text: String,
    saw_response: bool,
    token_usage: TokenUsage,
}

impl OllamaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body data to the parser
    pub fn feed_chunk(&mut self, chunk: &[u8]) {
        self.raw.extend_from_slice(chunk);
        self.pending.extend_from_slice(chunk);

        self.process_lines();
    }

    /// Process complete lines from the buffer
    fn process_lines(&mut self) {
        while let Some(newline_pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line = self.pending.split_to(newline_pos + 1);

            if line.trim_ascii().is_empty() {
                continue;
            }

            self.apply_line(&line);
        }
    }

    fn apply_line(&mut self, line: &[u8]) {
        match serde_json::from_slice::<OllamaGenerateChunk>(line) {
            Ok(chunk) => self.apply(chunk),
            Err(e) => tracing::debug!(
                "Failed to parse Ollama JSON line ({}): {:?}",
                e,
                String::from_utf8_lossy(line)
            ),
        }
    }

    fn apply(&mut self, chunk: OllamaGenerateChunk) {
        if let Some(error) = chunk.error {
            tracing::warn!("Ollama reported an error: {}", error);
        }

        if let Some(fragment) = chunk.response {
            self.text.push_str(&fragment);
            self.saw_response = true;
        }

        if chunk.done {
            if chunk.prompt_eval_count.is_some() {
                self.token_usage.prompt_tokens = chunk.prompt_eval_count;
            }
            if chunk.eval_count.is_some() {
                self.token_usage.completion_tokens = chunk.eval_count;
            }
        }
    }

    /// Finish parsing once the body has ended
    pub fn finalize(mut self) -> Result<GenerationResponse, BackendError> {
        if !self.pending.trim_ascii().is_empty() {
            let rest = self.pending.split();
            self.apply_line(&rest);
        }

        // A pretty-printed object spans several lines, none of which parse alone
        if !self.saw_response {
            if let Ok(chunk) = serde_json::from_slice::<OllamaGenerateChunk>(&self.raw) {
                self.apply(chunk);
            }
        }

        if !self.saw_response {
            tracing::debug!(
                "No response field in Ollama body: {:?}",
                String::from_utf8_lossy(&self.raw)
            );
            return Err(BackendError::Protocol);
        }

        Ok(GenerationResponse {
            raw: self.raw.freeze(),
            text: self.text,
            usage: self.token_usage,
        })
    }
}
