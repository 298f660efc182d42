//! Capability traits for the fallible inference operations the pipeline consumes.
//!
//! The pipeline never talks to a model runtime directly. It consumes three narrow async
//! traits — [`Summarizer`], [`Classifier`], [`EntityExtractor`] — so any backend (local
//! Ollama runtime, remote API, test mock) can be injected at construction time without the
//! orchestrator changing. The production adapter lives in [`ollama`].

pub mod ollama;

use async_trait::async_trait;
use serde::Serialize;
use serde::ser::SerializeMap;
use thiserror::Error;

pub use ollama::{OllamaClient, get_inference_client};

/// Errors surfaced by inference capability invocations.
///
/// Every call site in the pipeline recovers from these with a defined fallback; they exist so
/// the degradation can be logged and counted, not so they can propagate.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Provider was unreachable or explicitly disabled.
    #[error("Inference provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Inference request failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Score assigned to a single candidate category label.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    /// Candidate label as supplied by the caller.
    pub label: String,
    /// Relevance score; scores are not required to sum to 1.
    pub score: f64,
}

/// A named entity recognized in a piece of text.
///
/// Serializes as a single-key object `{"<entity_type>": "<surface_text>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity category (for example `PER`, `ORG`, `LOC`).
    pub entity_type: String,
    /// Exact text span the entity was recognized from.
    pub surface_text: String,
}

impl Serialize for Entity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.entity_type, &self.surface_text)?;
        map.end()
    }
}

/// Produce a shorter rendition of the supplied text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`; implementations may be slow and must be assumed fallible.
    async fn summarize(&self, text: &str) -> Result<String, InferenceError>;
}

/// Score text against a caller-supplied set of candidate labels.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Return one score per label, in the caller's label order.
    ///
    /// Empty `text` or an empty label set yields an empty result, not an error.
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<CategoryScore>, InferenceError>;
}

/// Recognize named entities in text.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Return recognized entities in document order.
    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, InferenceError>;
}
