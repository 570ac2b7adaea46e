//! Helpers for constructing and reading Qdrant payloads.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::processing::types::SourceRef;
use crate::qdrant::types::PointInsert;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(point: &PointInsert, embedding_model: &str, ingested_at: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(point.chunk.content.clone()));
    payload.insert("source".into(), Value::String(point.chunk.source.clone()));
    if let Some(page) = point.chunk.page_start {
        payload.insert("page_start".into(), Value::from(page));
    }
    if let Some(page) = point.chunk.page_end {
        payload.insert("page_end".into(), Value::from(page));
    }
    payload.insert("chunk_hash".into(), Value::String(point.chunk_hash.clone()));
    payload.insert(
        "embedding_model".into(),
        Value::String(embedding_model.to_string()),
    );
    payload.insert("ingested_at".into(), Value::String(ingested_at.to_string()));
    Value::Object(payload)
}

/// Read the provenance fields back out of a stored payload.
pub fn payload_source(payload: &Map<String, Value>) -> SourceRef {
    let page = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    };

    SourceRef {
        source: payload
            .get("source")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("unknown")
            .to_string(),
        page_start: page("page_start"),
        page_end: page("page_end"),
    }
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct a point identifier.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}
