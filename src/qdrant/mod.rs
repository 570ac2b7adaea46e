//! Qdrant vector store integration.

pub mod client;
pub mod payload;
pub mod types;

use async_trait::async_trait;

pub use client::QdrantService;
pub use payload::{compute_chunk_hash, payload_source};
pub use types::{IndexSummary, PointInsert, QdrantError, ScoredPoint, SearchParams};

/// Storage operations the ingest and ask paths need from a vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection when it does not exist yet.
    async fn ensure_collection(&self, collection: &str, dimension: u64) -> Result<(), QdrantError>;

    /// Drop the collection if present and create it empty.
    async fn recreate_collection(
        &self,
        collection: &str,
        dimension: u64,
    ) -> Result<(), QdrantError>;

    /// Number of vectors stored; zero for a missing collection.
    async fn count(&self, collection: &str) -> Result<u64, QdrantError>;

    /// Store points with their chunk payloads, tagged with the embedding model identity.
    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointInsert>,
        embedding_model: &str,
    ) -> Result<IndexSummary, QdrantError>;

    /// Nearest passages for `vector`.
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, QdrantError>;
}
