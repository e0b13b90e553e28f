mod ollama;

pub use ollama::OllamaParser;
