//! HTTP surface for Rusty RAG.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Service name, version, and the available endpoints.
//! - `GET /api/v1/health` – Liveness plus a vector store reachability probe.
//! - `POST /api/v1/ingest` – Index the PDF directory. Accepts `{ "force": bool }`; without
//!   `force` an already populated collection is left untouched.
//! - `POST /api/v1/ask` – Answer a question from the indexed documents. Returns the answer and
//!   the source files and page ranges of the passages it was grounded on.
//! - `DELETE /api/v1/memory` – Forget the shared conversation history.
//! - `GET /api/v1/metrics` – Ingest and question counters.
//!
//! Validation failures map to `400`, missing documents or an empty index to `404`, and
//! everything else to `500`; the body is the error text.

use crate::processing::{AskRequest, RagApi, ServiceError};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Build the HTTP router exposing the ingest and question-answering API.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RagApi + 'static,
{
    Router::new()
        .route("/", get(get_root))
        .route("/api/v1/health", get(get_health::<S>))
        .route("/api/v1/ingest", post(ingest_documents::<S>))
        .route("/api/v1/ask", post(ask_question::<S>))
        .route("/api/v1/memory", delete(clear_memory::<S>))
        .route("/api/v1/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Descriptor for a single endpoint in the service catalog.
#[derive(Serialize)]
struct EndpointDescriptor {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    version: &'static str,
    endpoints: Vec<EndpointDescriptor>,
}

async fn get_root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "rusty-rag",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            EndpointDescriptor {
                method: "GET",
                path: "/api/v1/health",
                description: "Service liveness and vector store reachability.",
            },
            EndpointDescriptor {
                method: "POST",
                path: "/api/v1/ingest",
                description: "Index the PDF directory; pass {\"force\": true} to rebuild.",
            },
            EndpointDescriptor {
                method: "POST",
                path: "/api/v1/ask",
                description: "Answer a question with sources from the indexed documents.",
            },
            EndpointDescriptor {
                method: "DELETE",
                path: "/api/v1/memory",
                description: "Clear the conversation history.",
            },
            EndpointDescriptor {
                method: "GET",
                path: "/api/v1/metrics",
                description: "Ingest and question counters.",
            },
        ],
    })
}

async fn get_health<S>(State(service): State<Arc<S>>) -> Response
where
    S: RagApi,
{
    Json(service.health().await).into_response()
}

/// Request body for `POST /api/v1/ingest`.
#[derive(Deserialize, Default)]
struct IngestRequest {
    /// Drop and rebuild the collection even when it already holds vectors.
    #[serde(default)]
    force: bool,
}

/// Success response for `POST /api/v1/ingest`.
#[derive(Serialize)]
struct IngestResponse {
    message: String,
    documents_indexed: u64,
    collection_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed_files: Vec<String>,
}

/// Index the document directory.
///
/// The body is optional; an empty request behaves like `{ "force": false }`.
async fn ingest_documents<S>(
    State(service): State<Arc<S>>,
    request: Option<Json<IngestRequest>>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: RagApi,
{
    let Json(IngestRequest { force }) = request.unwrap_or_default();
    let outcome = service.ingest(force).await?;
    tracing::info!(
        collection = %outcome.collection_name,
        documents_indexed = outcome.documents_indexed,
        reindexed = outcome.reindexed,
        "Ingest request completed"
    );
    Ok(Json(IngestResponse {
        message: outcome.message,
        documents_indexed: outcome.documents_indexed,
        collection_name: outcome.collection_name,
        failed_files: outcome.failed_files,
    }))
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Response, AppError>
where
    S: RagApi,
{
    let answer = service.ask(request).await?;
    Ok(Json(answer).into_response())
}

/// Response body for `DELETE /api/v1/memory`.
#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn clear_memory<S>(State(service): State<Arc<S>>) -> Json<MessageResponse>
where
    S: RagApi,
{
    service.clear_memory().await;
    Json(MessageResponse {
        message: "Conversation memory cleared",
    })
}

/// Return the ingest and question counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Response
where
    S: RagApi,
{
    Json(service.metrics_snapshot()).into_response()
}

struct AppError(ServiceError);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NoDocuments(_)
            | ServiceError::NoContent(_)
            | ServiceError::NotIndexed(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        Answer, AskRequest, HealthSnapshot, IngestOutcome, RagApi, ServiceError, SourceRef,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubRagService {
        ingests: Mutex<Vec<bool>>,
        questions: Mutex<Vec<AskRequest>>,
        cleared: Mutex<usize>,
        indexed: bool,
    }

    #[async_trait]
    impl RagApi for StubRagService {
        async fn ingest(&self, force: bool) -> Result<IngestOutcome, ServiceError> {
            self.ingests.lock().await.push(force);
            Ok(IngestOutcome {
                message: "Ingest completed successfully. 12 chunks indexed.".into(),
                documents_indexed: 12,
                collection_name: "first_aid".into(),
                reindexed: true,
                skipped_duplicates: 0,
                failed_files: Vec::new(),
            })
        }

        async fn ask(&self, request: AskRequest) -> Result<Answer, ServiceError> {
            if request.question.trim().is_empty() {
                return Err(ServiceError::InvalidRequest(
                    "question must not be empty".into(),
                ));
            }
            if !self.indexed {
                return Err(ServiceError::NotIndexed("first_aid".into()));
            }
            let conversation_id = request.conversation_id.clone();
            self.questions.lock().await.push(request);
            Ok(Answer {
                answer: "Cool the burn with running water.".into(),
                sources: vec![SourceRef {
                    source: "burns.pdf".into(),
                    page_start: Some(3),
                    page_end: Some(4),
                }],
                conversation_id,
            })
        }

        async fn clear_memory(&self) {
            *self.cleared.lock().await += 1;
        }

        async fn health(&self) -> HealthSnapshot {
            HealthSnapshot {
                status: "healthy",
                service: "rusty-rag",
                vector_store_reachable: true,
                indexed_chunks: Some(12),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                ingest_runs: 1,
                documents_indexed: 2,
                chunks_indexed: 12,
                questions_answered: 5,
            }
        }
    }

    fn indexed_service() -> Arc<StubRagService> {
        Arc::new(StubRagService {
            indexed: true,
            ..StubRagService::default()
        })
    }

    async fn send(
        service: Arc<StubRagService>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(payload) => {
                builder = builder.header("content-type", "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };
        let response = create_router(service)
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let (status, body) = send(indexed_service(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["service"], "rusty-rag");
        let paths: Vec<&str> = json["endpoints"]
            .as_array()
            .expect("endpoints")
            .iter()
            .filter_map(|endpoint| endpoint["path"].as_str())
            .collect();
        assert!(paths.contains(&"/api/v1/ask"));
        assert!(paths.contains(&"/api/v1/ingest"));
    }

    #[tokio::test]
    async fn ingest_route_forwards_force_flag() {
        let service = indexed_service();
        let (status, body) = send(
            service.clone(),
            Method::POST,
            "/api/v1/ingest",
            Some(json!({ "force": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["documents_indexed"], 12);
        assert_eq!(json["collection_name"], "first_aid");
        assert!(json.get("failed_files").is_none());
        assert_eq!(*service.ingests.lock().await, vec![true]);
    }

    #[tokio::test]
    async fn ingest_route_accepts_missing_body() {
        let service = indexed_service();
        let (status, _) = send(service.clone(), Method::POST, "/api/v1/ingest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*service.ingests.lock().await, vec![false]);
    }

    #[tokio::test]
    async fn ask_route_returns_answer_and_sources() {
        let service = indexed_service();
        let (status, body) = send(
            service.clone(),
            Method::POST,
            "/api/v1/ask",
            Some(json!({
                "question": "How do I treat a burn?",
                "prompt_type": "few_shot",
                "conversation_id": "abc"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["answer"], "Cool the burn with running water.");
        assert_eq!(json["sources"][0]["source"], "burns.pdf");
        assert_eq!(json["sources"][0]["page_start"], 3);
        assert_eq!(json["sources"][0]["page_end"], 4);
        assert_eq!(json["conversation_id"], "abc");

        let questions = service.questions.lock().await;
        assert_eq!(questions.len(), 1);
        assert!(questions[0].use_memory);
        assert_eq!(questions[0].prompt_type.as_deref(), Some("few_shot"));
    }

    #[tokio::test]
    async fn ask_route_maps_validation_errors_to_bad_request() {
        let (status, body) = send(
            indexed_service(),
            Method::POST,
            "/api/v1/ask",
            Some(json!({ "question": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("question must not be empty"));
    }

    #[tokio::test]
    async fn ask_route_maps_empty_index_to_not_found() {
        let service = Arc::new(StubRagService::default());
        let (status, body) = send(
            service,
            Method::POST,
            "/api/v1/ask",
            Some(json!({ "question": "What is CPR?" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(&body).contains("first_aid"));
    }

    #[tokio::test]
    async fn memory_route_clears_history() {
        let service = indexed_service();
        let (status, _) = send(service.clone(), Method::DELETE, "/api/v1/memory", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*service.cleared.lock().await, 1);
    }

    #[tokio::test]
    async fn health_and_metrics_routes_report_snapshots() {
        let (status, body) = send(indexed_service(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["vector_store_reachable"], true);

        let (status, body) = send(indexed_service(), Method::GET, "/api/v1/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["questions_answered"], 5);
        assert_eq!(json["chunks_indexed"], 12);
    }
}
