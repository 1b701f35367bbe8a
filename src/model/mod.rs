pub mod ollama;

pub use ollama::OllamaBackend;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model backend unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { attempts: u32, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A language-model backend that turns one prompt into one completion.
/// The call resolves only once the full text is available.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name (e.g., "ollama")
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}
