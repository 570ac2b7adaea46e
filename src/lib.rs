#![deny(missing_docs)]

//! Core library for the Rusty RAG question answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Shared conversation history for follow-up questions.
pub mod conversation;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Language model adapters, prompt variants, and answering.
pub mod generation;
/// PDF discovery and page extraction.
pub mod loader;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingest and question metrics helpers.
pub mod metrics;
/// Document processing pipeline and the RAG service.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
