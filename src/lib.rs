#![deny(missing_docs)]

//! Core library for the finsum financial-report summarizer.

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text-generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Summarization pipeline stages and orchestration.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Markdown rendering of generated summaries.
pub mod render;
/// Vector store abstraction and in-memory backend.
pub mod vector_store;
