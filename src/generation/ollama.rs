//! Ollama completion adapter.
//!
//! Issues non-streaming requests to `/api/generate`, the same way the embedding adapter talks
//! to `/api/embed`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{GenerationError, LanguageModel};

/// Ollama-backed language model.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaGenerationClient {
    /// Build a client for `model` served at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent("rusty-rag/generate")
            .build()
            .map_err(|error| GenerationError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for OllamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"stream\":false");
                then.status(200).json_body(json!({
                    "response": " Elevate the limb. ",
                    "done": true
                }));
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url(), "llama3", 0.2).expect("client");
        let text = client.generate("How to stop bleeding?").await.expect("text");

        mock.assert();
        assert_eq!(text, "Elevate the limb.");
    }

    #[tokio::test]
    async fn handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url(), "llama3", 0.2).expect("client");
        let error = client.generate("q").await.expect_err("error response");

        assert!(
            matches!(error, GenerationError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let client = OllamaGenerationClient::new(server.base_url(), "llama3", 0.2).expect("client");
        let error = client.generate("q").await.expect_err("incomplete");
        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }
}
