//! Document processing: page cleanup, coalescing, chunking, and the ingest/ask service.

pub mod chunking;
pub mod coalesce;
mod indexer;
pub(crate) mod mappers;
pub mod normalize;
pub mod pipeline;
mod service;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

pub use chunking::ChunkSplitter;
pub use indexer::{Indexer, preview_documents};
pub use pipeline::{PipelineConfig, PipelineOutput, PreprocessPipeline};
pub use service::{RagApi, RagService};
pub use types::{
    Answer, AskRequest, Chunk, CleanedUnit, HealthSnapshot, IngestOutcome, IngestPreview, Page,
    PipelineError, RetrievedPassage, ServiceError, SourceRef,
};
