//! HTTP client wrapper for interacting with Qdrant.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

use crate::qdrant::{
    VectorStore,
    payload::{build_payload, current_timestamp_rfc3339, generate_point_id},
    types::{
        CountResponse, IndexSummary, PointInsert, QdrantError, QueryResponse,
        QueryResponseResult, ScoredPoint, SearchParams,
    },
};

/// Points sent per upsert request.
const UPSERT_BATCH_SIZE: usize = 256;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for the Qdrant instance at `url`.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("rusty-rag/0.1").build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create a collection with cosine distance and the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    /// Drop a collection. A missing collection is not an error.
    pub async fn delete_collection(&self, collection_name: &str) -> Result<(), QdrantError> {
        let response = self
            .request(Method::DELETE, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(collection = collection_name, "Collection already absent");
            return Ok(());
        }

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection deleted");
        })
        .await
    }

    /// Exact number of points stored in a collection; zero when the collection is missing.
    pub async fn count_points(&self, collection_name: &str) -> Result<u64, QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/count"),
            )?
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(0),
            status if status.is_success() => {
                let payload: CountResponse = response.json().await?;
                Ok(payload.result.count)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Qdrant count failed");
                Err(error)
            }
        }
    }

    /// Upload vectors with their chunk payloads to the given collection.
    pub async fn index_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
        embedding_model: &str,
    ) -> Result<IndexSummary, QdrantError> {
        if points.is_empty() {
            return Ok(IndexSummary::default());
        }

        let now = current_timestamp_rfc3339();
        let mut inserted = 0;

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let serialized: Vec<Value> = batch
                .iter()
                .map(|point| {
                    json!({
                        "id": generate_point_id(),
                        "vector": point.vector,
                        "payload": build_payload(point, embedding_model, &now),
                    })
                })
                .collect();

            let point_count = serialized.len();
            let response = self
                .request(
                    Method::PUT,
                    &format!("collections/{collection_name}/points"),
                )?
                .query(&[("wait", true)])
                .json(&json!({ "points": serialized }))
                .send()
                .await?;

            self.ensure_success(response, || {
                tracing::debug!(
                    collection = collection_name,
                    points = point_count,
                    "Points indexed"
                );
            })
            .await?;
            inserted += point_count;
        }

        Ok(IndexSummary { inserted })
    }

    /// Query a collection by vector, with MMR reranking when requested.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = build_query_body(vector, params);

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn ensure_collection(&self, collection: &str, dimension: u64) -> Result<(), QdrantError> {
        self.create_collection_if_not_exists(collection, dimension)
            .await
    }

    async fn recreate_collection(
        &self,
        collection: &str,
        dimension: u64,
    ) -> Result<(), QdrantError> {
        self.delete_collection(collection).await?;
        self.create_collection(collection, dimension).await?;
        tracing::info!(collection, dimension, "Collection recreated");
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, QdrantError> {
        self.count_points(collection).await
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointInsert>,
        embedding_model: &str,
    ) -> Result<IndexSummary, QdrantError> {
        self.index_points(collection, points, embedding_model).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        self.search_points(collection, vector, params).await
    }
}

fn build_query_body(vector: Vec<f32>, params: &SearchParams) -> Value {
    let query = if params.use_mmr {
        json!({
            "nearest": vector,
            "mmr": {
                "diversity": 1.0 - params.lambda_mult,
                "candidates_limit": params.fetch_k.max(params.k),
            }
        })
    } else {
        json!(vector)
    };

    json!({
        "query": query,
        "limit": params.k,
        "with_payload": true,
    })
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::Chunk;
    use httpmock::{
        Method::{DELETE, POST, PUT},
        MockServer,
    };

    fn service(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("rusty-rag-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: None,
        }
    }

    #[test]
    fn mmr_query_maps_lambda_to_diversity() {
        let body = build_query_body(vec![0.5, 0.5], &SearchParams::default());
        assert_eq!(body["limit"], 12);
        assert_eq!(body["query"]["nearest"], json!([0.5, 0.5]));
        assert_eq!(body["query"]["mmr"]["candidates_limit"], 20);
        assert_eq!(body["query"]["mmr"]["diversity"], 0.5);
    }

    #[test]
    fn similarity_query_sends_plain_vector() {
        let params = SearchParams {
            k: 3,
            use_mmr: false,
            ..SearchParams::default()
        };
        let body = build_query_body(vec![1.0], &params);
        assert_eq!(body["query"], json!([1.0]));
        assert_eq!(body["limit"], 3);
    }

    #[tokio::test]
    async fn search_points_parses_scored_payloads() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/guides/points/query")
                    .body_contains("\"mmr\"");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "point-1",
                                "score": 0.42,
                                "payload": { "text": "Example", "source": "guia.pdf", "page_start": 2 }
                            }
                        ]
                    }
                }));
            })
            .await;

        let results = service(&server)
            .search_points("guides", vec![0.1, 0.2], &SearchParams::default())
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "point-1");
        assert!((results[0].score - 0.42).abs() < f32::EPSILON);
        let payload = results[0].payload.as_ref().expect("payload");
        assert_eq!(payload["source"], "guia.pdf");
    }

    #[tokio::test]
    async fn count_treats_missing_collection_as_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/missing/points/count");
                then.status(404).body("Not found");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/guides/points/count");
                then.status(200)
                    .json_body(json!({ "result": { "count": 7 }, "status": "ok" }));
            })
            .await;

        let service = service(&server);
        assert_eq!(service.count("missing").await.expect("count"), 0);
        assert_eq!(service.count("guides").await.expect("count"), 7);
    }

    #[tokio::test]
    async fn recreate_drops_then_creates() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/collections/guides");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/guides")
                    .body_contains("\"size\":8");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        service(&server)
            .recreate_collection("guides", 8)
            .await
            .expect("recreate");

        delete.assert();
        create.assert();
    }

    #[tokio::test]
    async fn upsert_sends_payload_and_reports_count() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/guides/points")
                    .query_param("wait", "true")
                    .body_contains("\"embedding_model\":\"hashing-2\"")
                    .body_contains("\"source\":\"guia.pdf\"");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let points = vec![PointInsert {
            chunk: Chunk {
                content: "text".into(),
                source: "guia.pdf".into(),
                page_start: Some(1),
                page_end: Some(1),
            },
            chunk_hash: "abc".into(),
            vector: vec![0.0, 1.0],
        }];

        let summary = service(&server)
            .upsert("guides", points, "hashing-2")
            .await
            .expect("upsert");

        mock.assert();
        assert_eq!(summary.inserted, 1);
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/guides/points/query");
                then.status(500).body("boom");
            })
            .await;

        let error = service(&server)
            .search("guides", vec![0.0], &SearchParams::default())
            .await
            .expect_err("server error");
        assert!(matches!(
            error,
            QdrantError::UnexpectedStatus { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}
