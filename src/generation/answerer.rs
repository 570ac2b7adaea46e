//! Retrieval-augmented answering.
//!
//! An [`Answerer`] is assembled per request from the prompt variant, a retriever, the language
//! model, and optionally the shared conversation memory. With memory and prior turns, the
//! follow-up question is first condensed into a standalone question which drives retrieval;
//! the original question is what the final prompt answers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::conversation::ConversationMemory;
use crate::embedding::EmbeddingClient;
use crate::generation::prompt::{PromptVariant, condense_question_prompt};
use crate::generation::LanguageModel;
use crate::processing::mappers::map_scored_point;
use crate::processing::types::{Answer, RetrievedPassage, ServiceError};
use crate::qdrant::{SearchParams, VectorStore};

/// Answer returned when the model produces no text.
pub const EMPTY_ANSWER: &str = "No answer was produced.";

/// Source of passages relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Passages relevant to `query`, most relevant first.
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, ServiceError>;
}

/// Retriever that embeds the query and searches a vector store collection.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    params: SearchParams,
}

impl VectorRetriever {
    /// Build a retriever over `collection`.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            params,
        }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, ServiceError> {
        let mut vectors = self
            .embedder
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or_else(|| {
            ServiceError::InvalidRequest("embedding provider returned no vector".into())
        })?;

        let hits = self
            .store
            .search(&self.collection, vector, &self.params)
            .await?;

        let expected_model = self.embedder.identifier();
        let mismatched = hits
            .iter()
            .filter_map(|hit| hit.payload.as_ref())
            .filter_map(|payload| payload.get("embedding_model").and_then(|v| v.as_str()))
            .any(|model| model != expected_model);
        if mismatched {
            tracing::warn!(
                collection = %self.collection,
                expected = %expected_model,
                "Retrieved passages were indexed with a different embedding model; re-ingest with force"
            );
        }

        let passages: Vec<RetrievedPassage> = hits.into_iter().filter_map(map_scored_point).collect();
        tracing::debug!(
            collection = %self.collection,
            passages = passages.len(),
            mmr = self.params.use_mmr,
            "Retrieved passages"
        );
        Ok(passages)
    }
}

/// Per-request answering flow.
pub struct Answerer<'a> {
    variant: PromptVariant,
    retriever: &'a dyn Retriever,
    llm: &'a dyn LanguageModel,
    memory: Option<&'a ConversationMemory>,
}

impl<'a> Answerer<'a> {
    /// Stateless answerer.
    pub fn new(
        variant: PromptVariant,
        retriever: &'a dyn Retriever,
        llm: &'a dyn LanguageModel,
    ) -> Self {
        Self {
            variant,
            retriever,
            llm,
            memory: None,
        }
    }

    /// Read from and record into `memory`.
    pub fn with_memory(mut self, memory: &'a ConversationMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Answer `question`, returning the text and the provenance of the passages used.
    pub async fn answer(&self, question: &str) -> Result<Answer, ServiceError> {
        let query = match self.memory {
            Some(memory) => self.standalone_question(memory, question).await?,
            None => question.to_string(),
        };

        let passages = self.retriever.retrieve(&query).await?;
        let prompt = self.variant.render(question, &passages);
        let generated = self.llm.generate(&prompt).await?;
        let answer = if generated.trim().is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            generated.trim().to_string()
        };

        if let Some(memory) = self.memory {
            memory.append(question, answer.clone()).await;
        }

        tracing::info!(
            prompt_type = %self.variant,
            passages = passages.len(),
            condensed = query != question,
            "Answered question"
        );

        Ok(Answer {
            answer,
            sources: passages.into_iter().map(|passage| passage.source).collect(),
            conversation_id: None,
        })
    }

    async fn standalone_question(
        &self,
        memory: &ConversationMemory,
        question: &str,
    ) -> Result<String, ServiceError> {
        let history = memory.history().await;
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let condensed = self
            .llm
            .generate(&condense_question_prompt(&history, question))
            .await?;
        let condensed = condensed.trim();
        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            tracing::debug!(original = question, standalone = condensed, "Condensed follow-up");
            Ok(condensed.to_string())
        }
    }
}
