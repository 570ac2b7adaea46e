//! Mapping helpers for Qdrant payloads and chunk preparation.

use crate::{
    processing::types::{Chunk, RetrievedPassage},
    qdrant::{self, compute_chunk_hash, payload_source},
};
use serde_json::Value;
use std::collections::HashSet;

/// Chunk with the hash stored next to it.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    /// Chunk text and provenance.
    pub(crate) chunk: Chunk,
    /// Stable digest of the chunk text.
    pub(crate) chunk_hash: String,
}

/// Remove chunks identical in text and provenance, keeping the first occurrence.
///
/// Identical text from different pages or files is kept: each copy carries distinct provenance.
pub(crate) fn dedupe_chunks(chunks: Vec<Chunk>) -> (Vec<PreparedChunk>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for chunk in chunks {
        if chunk.content.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&chunk.content);
        let key = (
            hash.clone(),
            chunk.source.clone(),
            chunk.page_start,
            chunk.page_end,
        );
        if seen.insert(key) {
            prepared.push(PreparedChunk {
                chunk,
                chunk_hash: hash,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}

/// Map a Qdrant scored point into a retrieved passage. Points without text are dropped.
pub(crate) fn map_scored_point(point: qdrant::ScoredPoint) -> Option<RetrievedPassage> {
    let qdrant::ScoredPoint { id, score, payload } = point;
    let Some(payload) = payload else {
        tracing::debug!(point = %id, "Ignoring point without payload");
        return None;
    };

    let text = match payload.get("text") {
        Some(Value::String(value)) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            tracing::debug!(point = %id, "Ignoring point without text");
            return None;
        }
    };

    Some(RetrievedPassage {
        text,
        source: payload_source(&payload),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn chunk(content: &str, source: &str, page: u32) -> Chunk {
        Chunk {
            content: content.into(),
            source: source.into(),
            page_start: Some(page),
            page_end: Some(page),
        }
    }

    #[test]
    fn dedupe_chunks_removes_exact_duplicates_and_counts_skips() {
        let chunks = vec![
            chunk("alpha", "a.pdf", 1),
            chunk("beta", "a.pdf", 1),
            chunk("alpha", "a.pdf", 1),
            chunk("alpha", "a.pdf", 2),
            chunk("   ", "a.pdf", 3),
        ];
        let (deduped, skipped) = dedupe_chunks(chunks);
        let texts: Vec<_> = deduped
            .iter()
            .map(|prepared| prepared.chunk.content.as_str())
            .collect();
        assert_eq!(texts, vec!["alpha", "beta", "alpha"]);
        assert_eq!(skipped, 1);
        assert_eq!(deduped[0].chunk_hash, deduped[2].chunk_hash);
        assert_ne!(deduped[0].chunk_hash, deduped[1].chunk_hash);
    }

    #[test]
    fn map_scored_point_extracts_payload_fields() {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::String(" Example ".into()));
        payload.insert("source".into(), Value::String("guia.pdf".into()));
        payload.insert("page_start".into(), Value::from(2));
        payload.insert("page_end".into(), Value::from(3));

        let point = qdrant::ScoredPoint {
            id: "point-1".into(),
            score: 0.42,
            payload: Some(payload),
        };

        let passage = map_scored_point(point).expect("passage");
        assert_eq!(passage.text, "Example");
        assert_eq!(passage.source.source, "guia.pdf");
        assert_eq!(passage.source.page_start, Some(2));
        assert_eq!(passage.source.page_end, Some(3));
        assert!((passage.score - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn map_scored_point_skips_points_without_text() {
        let point = qdrant::ScoredPoint {
            id: "point-2".into(),
            score: 0.1,
            payload: Some(Map::new()),
        };
        assert!(map_scored_point(point).is_none());
    }
}
