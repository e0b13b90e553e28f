pub mod assets;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod ollama;
pub mod parsers;
pub mod types;

pub use config::{Config, OllamaConfig};
pub use error::{BackendError, GatewayError};
pub use gateway::{build_router, listen, serve, AppState};
pub use ollama::OllamaClient;
