//! Language model abstraction, prompt variants, and the question answering flow.
//!
//! Providers are plain HTTP adapters: Gemini's `generateContent` endpoint and Ollama's
//! non-streaming `/api/generate`. The provider is picked once from configuration.

pub mod answerer;
pub mod gemini;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, LlmProvider};

pub use answerer::{Answerer, Retriever, VectorRetriever};
pub use gemini::GeminiClient;
pub use ollama::OllamaGenerationClient;
pub use prompt::PromptVariant;

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider could not be reached or rejected the request outright.
    #[error("Language model unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Gemini was selected without an API key.
    #[error("LLM_API_KEY must be set when LLM_PROVIDER is gemini")]
    MissingApiKey,
}

/// Text-in, text-out completion interface.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the language model selected by configuration.
pub fn build_language_model(config: &Config) -> Result<Box<dyn LanguageModel>, GenerationError> {
    match config.llm_provider {
        LlmProvider::Gemini => {
            let api_key = config
                .llm_api_key
                .clone()
                .ok_or(GenerationError::MissingApiKey)?;
            let mut client =
                GeminiClient::new(api_key, &config.llm_model_name, config.llm_temperature)?;
            if let Some(base) = &config.llm_api_base {
                client = client.with_base_url(base.clone());
            }
            tracing::info!(model = %client.model(), "Using Gemini language model");
            Ok(Box::new(client))
        }
        LlmProvider::Ollama => {
            let client = OllamaGenerationClient::new(
                config.ollama_url.clone(),
                config.llm_model_name.clone(),
                config.llm_temperature,
            )?;
            tracing::info!(model = %config.llm_model_name, "Using Ollama language model");
            Ok(Box::new(client))
        }
    }
}
