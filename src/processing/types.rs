//! Core data types and error definitions for the processing pipeline.

use crate::{
    embedding::EmbeddingClientError, generation::GenerationError, loader::LoaderError,
    qdrant::QdrantError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One unit of raw extracted text as produced by a document loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Raw page text, before any normalization.
    pub content: String,
    /// Identifier of the originating file (file name for PDFs).
    pub source: String,
    /// Page number within the source, when the loader knows it.
    pub page_number: Option<u32>,
}

impl Page {
    /// Build a page from its parts.
    pub fn new(source: impl Into<String>, content: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            page_number,
        }
    }
}

/// Normalized, header-free text covering one page or a run of short pages.
///
/// `page_start`/`page_end` are only present when at least one contributing page had a known
/// page number; they hold the minimum and maximum of those numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedUnit {
    /// Cleaned text; never empty.
    pub content: String,
    /// Identifier of the originating file.
    pub source: String,
    /// Lowest known page number that contributed to this unit.
    pub page_start: Option<u32>,
    /// Highest known page number that contributed to this unit.
    pub page_end: Option<u32>,
}

impl CleanedUnit {
    /// Build a unit and derive its page range from the contributing page numbers.
    pub fn from_pages(
        content: impl Into<String>,
        source: impl Into<String>,
        pages: impl IntoIterator<Item = u32>,
    ) -> Self {
        let (page_start, page_end) = page_range(pages);
        Self {
            content: content.into(),
            source: source.into(),
            page_start,
            page_end,
        }
    }
}

/// Bounded-size fragment of a [`CleanedUnit`], ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text.
    pub content: String,
    /// Inherited from the parent unit.
    pub source: String,
    /// Inherited from the parent unit.
    pub page_start: Option<u32>,
    /// Inherited from the parent unit.
    pub page_end: Option<u32>,
}

impl Chunk {
    /// Provenance of this chunk, as shown next to answers.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            source: self.source.clone(),
            page_start: self.page_start,
            page_end: self.page_end,
        }
    }
}

fn page_range(pages: impl IntoIterator<Item = u32>) -> (Option<u32>, Option<u32>) {
    pages
        .into_iter()
        .fold((None, None), |(low, high): (Option<u32>, Option<u32>), page| {
            (
                Some(low.map_or(page, |value| value.min(page))),
                Some(high.map_or(page, |value| value.max(page))),
            )
        })
}

/// Invalid pipeline configuration, reported when the pipeline is built.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Chunks must be allowed to hold at least one character.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new content in every chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured overlap.
        overlap: usize,
        /// Configured chunk size.
        chunk_size: usize,
    },
    /// A header pattern failed to compile.
    #[error("invalid header pattern '{pattern}': {source}")]
    InvalidHeaderPattern {
        /// Pattern as configured.
        pattern: String,
        /// Compilation error reported by the regex engine.
        #[source]
        source: regex::Error,
    },
}

/// Source file and page range attached to a retrieved passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Originating file identifier.
    pub source: String,
    /// First page spanned, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_start: Option<u32>,
    /// Last page spanned, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_end: Option<u32>,
}

/// Passage returned by the retriever for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    /// Stored chunk text.
    pub text: String,
    /// Provenance metadata stored with the chunk.
    pub source: SourceRef,
    /// Score reported by the vector store.
    pub score: f32,
}

/// Uniform answer shape returned by every prompt variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Generated answer text.
    pub answer: String,
    /// Provenance of the passages the answer was grounded on, in retrieval order.
    pub sources: Vec<SourceRef>,
    /// Echo of the caller-supplied conversation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Parameters accepted by [`crate::processing::RagService::ask`].
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    /// Natural-language question.
    pub question: String,
    /// Whether the shared conversation history takes part in answering.
    #[serde(default = "default_use_memory")]
    pub use_memory: bool,
    /// Prompt variant name; unknown names fall back to the default variant.
    #[serde(default)]
    pub prompt_type: Option<String>,
    /// Opaque identifier echoed back in the answer.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

fn default_use_memory() -> bool {
    true
}

/// Summary of an ingestion run produced by [`crate::processing::RagService::ingest`].
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Human-readable status line.
    pub message: String,
    /// Number of vectors in the collection after the run.
    pub documents_indexed: u64,
    /// Collection that was written to.
    pub collection_name: String,
    /// Whether this run wrote anything.
    pub reindexed: bool,
    /// Number of chunks skipped because an identical chunk was already prepared.
    pub skipped_duplicates: usize,
    /// Files that could not be loaded and were skipped.
    pub failed_files: Vec<String>,
}

/// Per-source counts reported by a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Pages extracted from the source.
    pub pages: usize,
    /// Chunks produced from the source.
    pub chunks: usize,
}

/// Result of loading and chunking without touching any external service.
#[derive(Debug, Clone, Serialize)]
pub struct IngestPreview {
    /// Directory that was scanned.
    pub directory: String,
    /// Number of PDF files found.
    pub files: usize,
    /// Pages extracted across all files.
    pub pages: usize,
    /// Units produced by the coalescer.
    pub units: usize,
    /// Chunks produced by the splitter.
    pub chunks: usize,
    /// Counts per source file, sorted by name.
    pub sources: BTreeMap<String, SourceSummary>,
    /// Files that could not be loaded.
    pub failed_files: Vec<String>,
}

/// Reachability snapshot for the collaborators behind the service.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Always `"healthy"` when the process is serving.
    pub status: &'static str,
    /// Service identifier.
    pub service: &'static str,
    /// Whether the vector store answered a count request.
    pub vector_store_reachable: bool,
    /// Number of vectors in the default collection, when reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_chunks: Option<u64>,
}

/// Errors emitted by the ingest and question-answering service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Pipeline settings were rejected.
    #[error("Invalid pipeline configuration: {0}")]
    Pipeline(#[from] PipelineError),
    /// The document directory could not be read.
    #[error("Failed to load documents: {0}")]
    Loader(#[from] LoaderError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant interaction failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Language model failed to produce an answer.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationError),
    /// No PDF files were found to ingest.
    #[error("No PDF files found in {0}")]
    NoDocuments(String),
    /// PDF files were found but none yielded any text.
    #[error("No extractable text in the PDF files of {0}")]
    NoContent(String),
    /// The collection holds no vectors yet.
    #[error("Collection '{0}' contains no vectors; run an ingest first")]
    NotIndexed(String),
    /// Caller supplied an unusable request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// A background task failed to complete.
    #[error("Internal error: {0}")]
    Internal(String),
}
