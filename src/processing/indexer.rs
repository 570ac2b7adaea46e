//! Ingest orchestration: load PDFs, run the preprocessing pipeline, embed, and upsert.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::Config,
    embedding::{EmbeddingClient, build_embedding_client},
    loader::{DocumentLoader, LoadReport, PdfDirectoryLoader},
    metrics::RagMetrics,
    processing::{
        mappers::dedupe_chunks,
        pipeline::{PipelineOutput, PreprocessPipeline},
        types::{IngestOutcome, IngestPreview, ServiceError, SourceSummary},
    },
    qdrant::{IndexSummary, PointInsert, QdrantService, VectorStore},
};

/// Loaded and preprocessed documents.
struct LoadedBatch {
    files_found: usize,
    failed_files: Vec<String>,
    pages_per_source: BTreeMap<String, usize>,
    output: PipelineOutput,
}

/// Number of chunks embedded per provider call.
const EMBED_BATCH_SIZE: usize = 64;

/// Builds and rebuilds the vector index from the document directory.
///
/// Ingests are serialized: a forced rebuild never interleaves with another ingest.
pub struct Indexer {
    pipeline: Arc<PreprocessPipeline>,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    dimension: u64,
    metrics: Arc<RagMetrics>,
    lock: Mutex<()>,
}

impl Indexer {
    /// Assemble an indexer from its collaborators.
    pub fn new(
        pipeline: PreprocessPipeline,
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        dimension: u64,
        metrics: Arc<RagMetrics>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            loader,
            embedder,
            store,
            collection: collection.into(),
            dimension,
            metrics,
            lock: Mutex::new(()),
        }
    }

    /// Build an indexer over the configured PDF directory, embedder, and Qdrant collection.
    pub fn from_config(config: &Config, metrics: Arc<RagMetrics>) -> Result<Self, ServiceError> {
        let embedder: Arc<dyn EmbeddingClient> = Arc::from(build_embedding_client(config)?);
        let store: Arc<dyn VectorStore> = Arc::new(QdrantService::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
        )?);
        Self::from_parts(config, embedder, store, metrics)
    }

    /// Build an indexer from configuration, reusing already constructed clients.
    pub fn from_parts(
        config: &Config,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        metrics: Arc<RagMetrics>,
    ) -> Result<Self, ServiceError> {
        let pipeline = PreprocessPipeline::new(&config.pipeline)?;
        let loader: Arc<dyn DocumentLoader> = Arc::new(PdfDirectoryLoader::new(&config.pdfs_dir));
        Ok(Self::new(
            pipeline,
            loader,
            embedder,
            store,
            config.qdrant_collection_name.clone(),
            config.embedding_dimension as u64,
            metrics,
        ))
    }

    /// Collection written by this indexer.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Index every PDF, or report the existing index when already populated and `force` is off.
    pub async fn ingest(&self, force: bool) -> Result<IngestOutcome, ServiceError> {
        let _guard = self.lock.lock().await;
        tracing::info!(collection = %self.collection, force, "Starting ingest");

        let LoadedBatch {
            files_found,
            failed_files,
            output,
            ..
        } = load_and_process(Arc::clone(&self.loader), Arc::clone(&self.pipeline)).await?;

        let existing = self.store.count(&self.collection).await?;
        if existing > 0 && !force {
            tracing::info!(
                collection = %self.collection,
                existing,
                "Collection already indexed; skipping"
            );
            return Ok(IngestOutcome {
                message: format!(
                    "Collection '{}' already contains {existing} vectors. Use force=true to rebuild it.",
                    self.collection
                ),
                documents_indexed: existing,
                collection_name: self.collection.clone(),
                reindexed: false,
                skipped_duplicates: 0,
                failed_files,
            });
        }

        if output.chunks.is_empty() {
            return Err(ServiceError::NoContent(self.loader_label()));
        }

        if force {
            self.store
                .recreate_collection(&self.collection, self.dimension)
                .await?;
        } else {
            self.store
                .ensure_collection(&self.collection, self.dimension)
                .await?;
        }

        let (prepared, skipped_duplicates) = dedupe_chunks(output.chunks);
        let model = self.embedder.identifier();
        let mut inserted = 0;

        for batch in prepared.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch
                .iter()
                .map(|item| item.chunk.content.clone())
                .collect();
            let vectors = self.embedder.generate_embeddings(texts).await?;
            if vectors.len() != batch.len() {
                return Err(ServiceError::Internal(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            let points: Vec<PointInsert> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(item, vector)| PointInsert {
                    chunk: item.chunk,
                    chunk_hash: item.chunk_hash,
                    vector,
                })
                .collect();

            let IndexSummary { inserted: written } =
                self.store.upsert(&self.collection, points, &model).await?;
            inserted += written;
        }

        let indexed = self.store.count(&self.collection).await?;
        let documents = files_found.saturating_sub(failed_files.len());
        self.metrics.record_ingest(documents as u64, inserted as u64);

        tracing::info!(
            collection = %self.collection,
            documents,
            units = output.units.len(),
            inserted,
            skipped_duplicates,
            failed = failed_files.len(),
            "Ingest completed"
        );

        Ok(IngestOutcome {
            message: format!("Ingest completed successfully. {indexed} chunks indexed."),
            documents_indexed: indexed,
            collection_name: self.collection.clone(),
            reindexed: true,
            skipped_duplicates,
            failed_files,
        })
    }

    /// Load and chunk the documents without contacting the embedder or the vector store.
    pub async fn preview(&self) -> Result<IngestPreview, ServiceError> {
        preview_documents(Arc::clone(&self.loader), Arc::clone(&self.pipeline)).await
    }

    fn loader_label(&self) -> String {
        self.loader.describe()
    }
}

/// Load and chunk every document from `loader`, reporting per-source counts.
///
/// Nothing outside the loader is touched: no embedder, no vector store.
pub async fn preview_documents(
    loader: Arc<dyn DocumentLoader>,
    pipeline: Arc<PreprocessPipeline>,
) -> Result<IngestPreview, ServiceError> {
    let directory = loader.describe();
    let batch = load_and_process(loader, pipeline).await?;

    let mut sources: BTreeMap<String, SourceSummary> = batch
        .pages_per_source
        .into_iter()
        .map(|(source, pages)| (source, SourceSummary { pages, chunks: 0 }))
        .collect();
    for chunk in &batch.output.chunks {
        sources.entry(chunk.source.clone()).or_default().chunks += 1;
    }

    Ok(IngestPreview {
        directory,
        files: batch.files_found,
        pages: batch.output.page_count,
        units: batch.output.units.len(),
        chunks: batch.output.chunks.len(),
        sources,
        failed_files: batch.failed_files,
    })
}

async fn load_and_process(
    loader: Arc<dyn DocumentLoader>,
    pipeline: Arc<PreprocessPipeline>,
) -> Result<LoadedBatch, ServiceError> {
    let label = loader.describe();

    let batch = tokio::task::spawn_blocking(move || {
        let LoadReport {
            files_found,
            pages,
            failures,
        } = loader.load()?;
        let mut pages_per_source = BTreeMap::new();
        for page in &pages {
            *pages_per_source.entry(page.source.clone()).or_insert(0) += 1;
        }
        Ok::<_, ServiceError>(LoadedBatch {
            files_found,
            failed_files: failures.into_iter().map(|failure| failure.file).collect(),
            pages_per_source,
            output: pipeline.process(pages),
        })
    })
    .await
    .map_err(|error| ServiceError::Internal(format!("document loading task failed: {error}")))??;

    if batch.files_found == 0 {
        return Err(ServiceError::NoDocuments(label));
    }

    Ok(batch)
}
