use thiserror::Error;

/// Failures talking to the generation backend.
///
/// These never become HTTP errors: the gateway renders them as
/// `Error: <display>` inside a 200 chat reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Cannot connect to Ollama on port {port}")]
    Unreachable { port: u16 },

    #[error("Send failed")]
    Send,

    #[error("Receive failed")]
    Receive,

    #[error("Timed out waiting for Ollama after {secs}s")]
    Timeout { secs: u64 },

    #[error("Could not parse Ollama response")]
    Protocol,
}

impl BackendError {
    /// Text placed in the `response` field of the chat reply
    pub fn to_reply_text(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Failures that stop the gateway itself
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server on {addr} failed: {source}")]
    Serve {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
