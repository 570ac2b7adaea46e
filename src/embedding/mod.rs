//! Embedding client abstraction and adapters.
//!
//! The Ollama adapter talks to the runtime's `/api/embed` endpoint directly over `reqwest`.
//! The hashing adapter needs no network and produces deterministic vectors, which keeps
//! offline runs and tests reproducible.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::{Config, EmbeddingProvider};

/// Number of texts sent to Ollama per request.
pub const OLLAMA_BATCH_SIZE: usize = 32;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider response could not be interpreted.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identity stored alongside every vector.
    fn identifier(&self) -> String;

    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic byte-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = (idx + usize::from(byte)) % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    fn identifier(&self) -> String {
        format!("hashing-{}", self.dimension)
    }

    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

/// Ollama-backed embedder using `POST /api/embed`.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Build a client for `model` served at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("rusty-rag/embed")
            .build()
            .map_err(|error| EmbeddingClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": batch }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if body.embeddings.len() != batch.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {} embeddings, received {}",
                batch.len(),
                body.embeddings.len()
            )));
        }

        if let Some(vector) = body
            .embeddings
            .iter()
            .find(|vector| vector.len() != self.dimension)
        {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected dimension {}, received {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    fn identifier(&self) -> String {
        format!("ollama:{}", self.model)
    }

    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            batch_size = OLLAMA_BATCH_SIZE,
            "Generating embeddings"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(OLLAMA_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Build the embedding client selected by configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    match config.embedding_provider {
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbeddingClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?)),
        EmbeddingProvider::Hashing => {
            Ok(Box::new(HashingEmbeddingClient::new(config.embedding_dimension)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn hashing_vectors_are_deterministic_and_normalized() {
        let client = HashingEmbeddingClient::new(16);
        let vectors = client
            .generate_embeddings(vec!["burn care".into(), "burn care".into(), "cpr".into()])
            .await
            .expect("vectors");

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vectors[1]);
        assert_ne!(vectors[0], vectors[2]);
        let norm: f32 = vectors[0].iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hashing_rejects_empty_input() {
        let client = HashingEmbeddingClient::new(8);
        let error = client
            .generate_embeddings(Vec::new())
            .await
            .expect_err("empty input");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn ollama_client_batches_requests() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains("\"text 0\"");
                then.status(200).json_body(serde_json::json!({
                    "embeddings": vec![vec![0.5_f32, 0.5]; OLLAMA_BATCH_SIZE]
                }));
            })
            .await;
        let tail = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains("\"text 32\"");
                then.status(200)
                    .json_body(serde_json::json!({ "embeddings": [[1.0, 0.0]] }));
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(server.base_url(), "nomic-embed-text", 2).expect("client");
        let texts: Vec<String> = (0..=OLLAMA_BATCH_SIZE).map(|i| format!("text {i}")).collect();
        let vectors = client.generate_embeddings(texts).await.expect("vectors");

        assert_eq!(vectors.len(), OLLAMA_BATCH_SIZE + 1);
        assert_eq!(vectors[OLLAMA_BATCH_SIZE], vec![1.0, 0.0]);
        mock.assert_hits(1);
        tail.assert_hits(1);
    }

    #[tokio::test]
    async fn ollama_client_rejects_count_mismatch() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200)
                    .json_body(serde_json::json!({ "embeddings": [] }));
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "m", 2).expect("client");
        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("mismatch");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn ollama_client_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("model not loaded");
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "m", 2).expect("client");
        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("error status");
        assert!(
            matches!(error, EmbeddingClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }
}
