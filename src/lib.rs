#![deny(missing_docs)]

//! Core library for the Docsight document analysis service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from uploaded documents.
pub mod extract;
/// Inference capability traits and the Ollama-backed adapter.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis pipeline metrics helpers.
pub mod metrics;
/// Map-reduce document analysis pipeline.
pub mod processing;
