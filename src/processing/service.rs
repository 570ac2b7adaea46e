//! Application service tying ingest, retrieval, generation, and conversation memory together.

use crate::{
    config::Config,
    conversation::ConversationMemory,
    embedding::{EmbeddingClient, build_embedding_client},
    generation::{Answerer, LanguageModel, PromptVariant, Retriever, VectorRetriever, build_language_model},
    metrics::{MetricsSnapshot, RagMetrics},
    processing::{
        indexer::Indexer,
        types::{Answer, AskRequest, HealthSnapshot, IngestOutcome, IngestPreview, ServiceError},
    },
    qdrant::{QdrantService, VectorStore},
};
use async_trait::async_trait;
use std::sync::Arc;

const SERVICE_NAME: &str = "rusty-rag";

/// Coordinates ingest and question answering over one Qdrant collection.
///
/// The service owns long-lived handles to the embedder, vector store, language model, and the
/// process-wide conversation memory. Construct it once near process start and share it through
/// an `Arc`.
pub struct RagService {
    indexer: Indexer,
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LanguageModel>,
    memory: ConversationMemory,
    store: Arc<dyn VectorStore>,
    collection: String,
    metrics: Arc<RagMetrics>,
}

/// Abstraction over the service used by the HTTP surface.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Build the index from the document directory, or rebuild it when `force` is set.
    async fn ingest(&self, force: bool) -> Result<IngestOutcome, ServiceError>;

    /// Answer a question from the indexed documents.
    async fn ask(&self, request: AskRequest) -> Result<Answer, ServiceError>;

    /// Forget every stored conversation turn.
    async fn clear_memory(&self);

    /// Probe the vector store.
    async fn health(&self) -> HealthSnapshot;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RagService {
    /// Assemble the service from already constructed collaborators.
    pub fn new(
        indexer: Indexer,
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LanguageModel>,
        store: Arc<dyn VectorStore>,
        memory: ConversationMemory,
        metrics: Arc<RagMetrics>,
    ) -> Self {
        let collection = indexer.collection().to_string();
        Self {
            indexer,
            retriever,
            llm,
            memory,
            store,
            collection,
            metrics,
        }
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        tracing::info!("Initializing embedding client");
        let embedder: Arc<dyn EmbeddingClient> = Arc::from(build_embedding_client(config)?);
        tracing::info!(model = %embedder.identifier(), "Embedding client initialized");

        let store: Arc<dyn VectorStore> = Arc::new(QdrantService::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
        )?);
        let llm: Arc<dyn LanguageModel> = Arc::from(build_language_model(config)?);
        let metrics = Arc::new(RagMetrics::new());

        let indexer = Indexer::from_parts(
            config,
            Arc::clone(&embedder),
            Arc::clone(&store),
            Arc::clone(&metrics),
        )?;
        let retriever: Arc<dyn Retriever> = Arc::new(VectorRetriever::new(
            embedder,
            Arc::clone(&store),
            config.qdrant_collection_name.clone(),
            config.retrieval,
        ));

        tracing::debug!(
            collection = %config.qdrant_collection_name,
            k = config.retrieval.k,
            fetch_k = config.retrieval.fetch_k,
            mmr = config.retrieval.use_mmr,
            "Service ready"
        );

        Ok(Self::new(
            indexer,
            retriever,
            llm,
            store,
            ConversationMemory::new(config.memory_window),
            metrics,
        ))
    }

    /// Build the index from the document directory.
    pub async fn ingest(&self, force: bool) -> Result<IngestOutcome, ServiceError> {
        self.indexer.ingest(force).await
    }

    /// Load and chunk the documents without writing anything.
    pub async fn preview(&self) -> Result<IngestPreview, ServiceError> {
        self.indexer.preview().await
    }

    /// Answer a question with the requested prompt variant.
    pub async fn ask(&self, request: AskRequest) -> Result<Answer, ServiceError> {
        let AskRequest {
            question,
            use_memory,
            prompt_type,
            conversation_id,
        } = request;

        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "question must not be empty".into(),
            ));
        }

        let indexed = self.store.count(&self.collection).await?;
        if indexed == 0 {
            return Err(ServiceError::NotIndexed(self.collection.clone()));
        }

        let variant = PromptVariant::from_name(prompt_type.as_deref());
        let mut answerer = Answerer::new(variant, self.retriever.as_ref(), self.llm.as_ref());
        if use_memory {
            answerer = answerer.with_memory(&self.memory);
        }

        let mut answer = answerer.answer(question).await?;
        answer.conversation_id = conversation_id;
        self.metrics.record_question();
        Ok(answer)
    }

    /// Forget every stored conversation turn.
    pub async fn clear_memory(&self) {
        self.memory.clear().await;
        tracing::info!("Conversation memory cleared");
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Probe the vector store to surface a lightweight health snapshot.
    pub async fn health(&self) -> HealthSnapshot {
        match self.store.count(&self.collection).await {
            Ok(count) => HealthSnapshot {
                status: "healthy",
                service: SERVICE_NAME,
                vector_store_reachable: true,
                indexed_chunks: Some(count),
            },
            Err(error) => {
                tracing::warn!(error = %error, "Vector store health probe failed");
                HealthSnapshot {
                    status: "healthy",
                    service: SERVICE_NAME,
                    vector_store_reachable: false,
                    indexed_chunks: None,
                }
            }
        }
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn ingest(&self, force: bool) -> Result<IngestOutcome, ServiceError> {
        RagService::ingest(self, force).await
    }

    async fn ask(&self, request: AskRequest) -> Result<Answer, ServiceError> {
        RagService::ask(self, request).await
    }

    async fn clear_memory(&self) {
        RagService::clear_memory(self).await
    }

    async fn health(&self) -> HealthSnapshot {
        RagService::health(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}
