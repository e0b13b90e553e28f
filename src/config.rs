//! Command-line and environment configuration for the gateway.
//!
//! Every flag can also be supplied through a `NOVA_*` environment variable;
//! the defaults reproduce a stock local Ollama install.
use anyhow::anyhow;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Interface the gateway listens on.
    #[arg(long, env = "NOVA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the gateway listens on.
    #[arg(short = 'p', long, env = "NOVA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Host of the Ollama service.
    #[arg(long, env = "NOVA_OLLAMA_HOST", default_value = "127.0.0.1")]
    pub ollama_host: String,

    /// Port of the Ollama service.
    #[arg(long, env = "NOVA_OLLAMA_PORT", default_value_t = 11434)]
    pub ollama_port: u16,

    /// Model every prompt is sent to.
    #[arg(short = 'm', long, env = "NOVA_MODEL", default_value = "llama3.2:3b")]
    pub model: String,

    /// Upper bound on one Ollama call, connect through last body byte.
    #[arg(long, env = "NOVA_OLLAMA_TIMEOUT_SECS", default_value_t = 300)]
    pub ollama_timeout_secs: u64,

    /// Largest request body the gateway will read.
    #[arg(long, env = "NOVA_MAX_REQUEST_BYTES", default_value_t = 64 * 1024)]
    pub max_request_bytes: usize,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("Model name must not be empty"));
        }
        if self.ollama_host.trim().is_empty() {
            return Err(anyhow!("Ollama host must not be empty"));
        }
        if self.ollama_timeout_secs == 0 {
            return Err(anyhow!("Ollama timeout must be at least one second"));
        }
        if self.max_request_bytes == 0 {
            return Err(anyhow!("Maximum request size must be positive"));
        }
        Ok(self)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            host: self.ollama_host.clone(),
            port: self.ollama_port,
            model: self.model.clone(),
            timeout: Duration::from_secs(self.ollama_timeout_secs),
        }
    }
}

/// Where and how the backend client reaches Ollama
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "llama3.2:3b".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}
