//! In-memory collaborators for exercising the ingest and ask flows without network services.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::generation::{GenerationError, LanguageModel};
use crate::loader::{DocumentLoader, LoadFailure, LoadReport, LoaderError};
use crate::processing::types::Page;
use crate::qdrant::payload::build_payload;
use crate::qdrant::{IndexSummary, PointInsert, QdrantError, ScoredPoint, SearchParams, VectorStore};

#[derive(Default)]
pub(crate) struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<ScoredPoint>>>,
    vectors: Mutex<HashMap<String, Vec<Vec<f32>>>>,
    pub(crate) recreated: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn stored_texts(&self, collection: &str) -> Vec<String> {
        self.collections
            .lock()
            .expect("lock")
            .get(collection)
            .map(|points| {
                points
                    .iter()
                    .filter_map(|point| point.payload.as_ref())
                    .filter_map(|payload| payload.get("text").and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str, _dimension: u64) -> Result<(), QdrantError> {
        self.collections
            .lock()
            .expect("lock")
            .entry(collection.to_string())
            .or_default();
        self.vectors
            .lock()
            .expect("lock")
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn recreate_collection(
        &self,
        collection: &str,
        _dimension: u64,
    ) -> Result<(), QdrantError> {
        self.recreated.fetch_add(1, Ordering::SeqCst);
        self.collections
            .lock()
            .expect("lock")
            .insert(collection.to_string(), Vec::new());
        self.vectors
            .lock()
            .expect("lock")
            .insert(collection.to_string(), Vec::new());
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, QdrantError> {
        Ok(self
            .collections
            .lock()
            .expect("lock")
            .get(collection)
            .map_or(0, |points| points.len() as u64))
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointInsert>,
        embedding_model: &str,
    ) -> Result<IndexSummary, QdrantError> {
        let inserted = points.len();
        let mut collections = self.collections.lock().expect("lock");
        let mut vectors = self.vectors.lock().expect("lock");
        let stored = collections.entry(collection.to_string()).or_default();
        let stored_vectors = vectors.entry(collection.to_string()).or_default();
        for point in points {
            let payload = build_payload(&point, embedding_model, "2026-01-01T00:00:00Z");
            stored.push(ScoredPoint {
                id: format!("point-{}", stored.len()),
                score: 0.0,
                payload: payload.as_object().cloned(),
            });
            stored_vectors.push(point.vector);
        }
        Ok(IndexSummary { inserted })
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let collections = self.collections.lock().expect("lock");
        let vectors = self.vectors.lock().expect("lock");
        let (Some(points), Some(stored_vectors)) =
            (collections.get(collection), vectors.get(collection))
        else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredPoint> = points
            .iter()
            .zip(stored_vectors)
            .map(|(point, candidate)| ScoredPoint {
                id: point.id.clone(),
                score: candidate.iter().zip(&vector).map(|(a, b)| a * b).sum(),
                payload: point.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(params.k);
        Ok(scored)
    }
}

pub(crate) struct StaticLoader {
    pub(crate) files_found: usize,
    pub(crate) pages: Vec<Page>,
    pub(crate) failures: Vec<String>,
}

impl StaticLoader {
    pub(crate) fn new(files_found: usize, pages: Vec<Page>) -> Self {
        Self {
            files_found,
            pages,
            failures: Vec::new(),
        }
    }
}

impl DocumentLoader for StaticLoader {
    fn load(&self) -> Result<LoadReport, LoaderError> {
        Ok(LoadReport {
            files_found: self.files_found,
            pages: self.pages.clone(),
            failures: self
                .failures
                .iter()
                .map(|file| LoadFailure {
                    file: file.clone(),
                    reason: "unreadable".into(),
                })
                .collect(),
        })
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

/// Language model that records prompts and replies with a fixed answer.
pub(crate) struct ScriptedModel {
    reply: String,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub(crate) fn page(source: &str, number: u32, content: &str) -> Page {
    Page::new(source, content, Some(number))
}
