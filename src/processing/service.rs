//! Analysis service coordinating the map-reduce summarization pipeline.

use crate::{
    config::get_config,
    extract::{Document, DocumentText, extract_text},
    inference::{
        Classifier, EntityExtractor, InferenceError, Summarizer, get_inference_client,
    },
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::{DEFAULT_MAX_SENTENCES, chunk_by_sentences},
        types::{AnalysisReport, DEFAULT_CATEGORY_LABELS, ProcessingError},
    },
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use std::sync::Arc;

/// Coordinates the full analysis pipeline: chunking, map-reduce summarization, and the final
/// classification and entity pass.
///
/// The service owns long-lived handles to its three inference capabilities and the metrics
/// registry. Construct it once near process start and share it through an `Arc`; the
/// capabilities are injected so any backend (or a test mock) can stand behind them.
pub struct AnalysisService {
    summarizer: Arc<dyn Summarizer>,
    classifier: Arc<dyn Classifier>,
    entity_extractor: Arc<dyn EntityExtractor>,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the analysis pipeline used by the HTTP surface.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Extract text from a document and run the full analysis pipeline on it.
    async fn analyze_document(&self, document: Document)
    -> Result<AnalysisReport, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Build a service wired to the configured Ollama runtime.
    pub fn new() -> Self {
        tracing::info!("Initializing inference client");
        let client = get_inference_client();
        Self::with_capabilities(client.clone(), client.clone(), client)
    }

    /// Build a service from explicitly injected capabilities.
    pub fn with_capabilities(
        summarizer: Arc<dyn Summarizer>,
        classifier: Arc<dyn Classifier>,
        entity_extractor: Arc<dyn EntityExtractor>,
    ) -> Self {
        Self {
            summarizer,
            classifier,
            entity_extractor,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Run the map-reduce pipeline over already-extracted document text.
    ///
    /// Capability failures never abort the pipeline; each call site degrades to its fallback
    /// (the chunk's own text, the unreduced combined text, an empty entity list, an empty
    /// score map) and the degradation is logged and counted.
    pub async fn analyze_text(&self, text: &DocumentText) -> AnalysisReport {
        let config = get_config();
        let max_sentences = config.chunk_max_sentences.unwrap_or(DEFAULT_MAX_SENTENCES);
        let chunks = chunk_by_sentences(text.as_str(), max_sentences);
        tracing::info!(
            chunks = chunks.len(),
            max_sentences,
            "Summarizing document chunks"
        );

        // Map: each chunk summarized independently over a bounded window, results collected
        // back in original chunk order.
        let concurrency = config.map_concurrency.unwrap_or(1).max(1);
        let chunk_summaries: Vec<String> = stream::iter(chunks.clone().into_iter().map(
            |chunk| async move {
                self.recover(
                    "chunk_summary",
                    self.summarizer.summarize(&chunk).await,
                    chunk.clone(),
                )
            },
        ))
        .buffered(concurrency)
        .collect()
        .await;

        // Combine, then reduce: one more summarization pass bounds the input size that
        // classification and entity extraction ever see, however long the document was.
        let combined = chunk_summaries.join(" ");
        let final_summary = if combined.trim().is_empty() {
            combined
        } else {
            tracing::debug!("Creating final summary");
            self.recover(
                "final_summary",
                self.summarizer.summarize(&combined).await,
                combined.clone(),
            )
        };

        let entities = self.recover(
            "entities",
            self.entity_extractor.extract_entities(&final_summary).await,
            Vec::new(),
        );

        let labels = config.category_labels.clone().unwrap_or_else(|| {
            DEFAULT_CATEGORY_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect()
        });
        let categories = self.recover(
            "categories",
            self.classifier.classify(&final_summary, &labels).await,
            Vec::new(),
        );

        self.metrics.record_document(chunks.len() as u64);
        tracing::info!(
            chunks = chunks.len(),
            entities = entities.len(),
            "Document analyzed"
        );

        AnalysisReport {
            final_summary,
            categories,
            entities,
            original_chunk_count: chunks.len(),
        }
    }

    /// Shared degradation combinator: take the capability result or fall back, recording the
    /// failure so every call site applies the same policy.
    fn recover<T>(&self, stage: &'static str, result: Result<T, InferenceError>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(stage, error = %error, "Capability failed; using fallback");
                self.metrics.record_fallback();
                fallback
            }
        }
    }
}

impl Default for AnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze_document(
        &self,
        document: Document,
    ) -> Result<AnalysisReport, ProcessingError> {
        let text = extract_text(document)?;
        Ok(self.analyze_text(&text).await)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG, Config};
    use crate::extract::ExtractError;
    use crate::inference::{CategoryScore, Entity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ensure_test_config() {
        let _ = CONFIG.set(Config {
            ollama_url: None,
            summarizer_model: "test-model".into(),
            classifier_model: None,
            extractor_model: None,
            chunk_max_sentences: None,
            map_concurrency: Some(4),
            summary_max_words: None,
            category_labels: None,
            server_port: None,
        });
    }

    fn document_text(raw: &str) -> DocumentText {
        extract_text(Document::plain_text(raw.into())).expect("extractable text")
    }

    fn numbered_sentences(count: usize) -> String {
        (1..=count)
            .map(|i| format!("Sentence number {i} is here."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Summarizer that condenses each input to the numeric range it covers, so tests can see
    /// which chunk produced which summary and what the reduce step received.
    struct TaggingSummarizer {
        calls: AtomicUsize,
        inputs: tokio::sync::Mutex<Vec<String>>,
    }

    impl TaggingSummarizer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                inputs: tokio::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Summarizer for TaggingSummarizer {
        async fn summarize(&self, text: &str) -> Result<String, InferenceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().await.push(text.to_string());
            // Later calls finish first, so out-of-order completion is exercised.
            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(call as u64 * 10)))
                .await;
            let numbers: Vec<&str> = text
                .split(|c: char| !c.is_ascii_digit())
                .filter(|s| !s.is_empty())
                .collect();
            Ok(format!(
                "<{}-{}>",
                numbers.first().unwrap_or(&"x"),
                numbers.last().unwrap_or(&"x")
            ))
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String, InferenceError> {
            Err(InferenceError::GenerationFailed("model exploded".into()))
        }
    }

    struct StubClassifier;

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            text: &str,
            labels: &[String],
        ) -> Result<Vec<CategoryScore>, InferenceError> {
            if text.trim().is_empty() || labels.is_empty() {
                return Ok(Vec::new());
            }
            Ok(labels
                .iter()
                .enumerate()
                .map(|(index, label)| CategoryScore {
                    label: label.clone(),
                    score: 1.0 - index as f64 * 0.1,
                })
                .collect())
        }
    }

    struct StubExtractor;

    #[async_trait]
    impl EntityExtractor for StubExtractor {
        async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, InferenceError> {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![Entity {
                entity_type: "ORG".into(),
                surface_text: "Acme".into(),
            }])
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(
            &self,
            _text: &str,
            _labels: &[String],
        ) -> Result<Vec<CategoryScore>, InferenceError> {
            Err(InferenceError::ProviderUnavailable("down".into()))
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl EntityExtractor for FailingExtractor {
        async fn extract_entities(&self, _text: &str) -> Result<Vec<Entity>, InferenceError> {
            Err(InferenceError::ProviderUnavailable("down".into()))
        }
    }

    /// Capability set that panics if invoked; extraction failures must never reach inference.
    struct UnreachableCapability;

    #[async_trait]
    impl Summarizer for UnreachableCapability {
        async fn summarize(&self, _text: &str) -> Result<String, InferenceError> {
            panic!("summarizer invoked after extraction failure");
        }
    }

    #[async_trait]
    impl Classifier for UnreachableCapability {
        async fn classify(
            &self,
            _text: &str,
            _labels: &[String],
        ) -> Result<Vec<CategoryScore>, InferenceError> {
            panic!("classifier invoked after extraction failure");
        }
    }

    #[async_trait]
    impl EntityExtractor for UnreachableCapability {
        async fn extract_entities(&self, _text: &str) -> Result<Vec<Entity>, InferenceError> {
            panic!("extractor invoked after extraction failure");
        }
    }

    #[tokio::test]
    async fn twenty_five_sentences_map_reduce_to_three_chunks() {
        ensure_test_config();
        let summarizer = Arc::new(TaggingSummarizer::new());
        let service = AnalysisService::with_capabilities(
            summarizer.clone(),
            Arc::new(StubClassifier),
            Arc::new(StubExtractor),
        );

        let text = document_text(&numbered_sentences(25));
        let report = service.analyze_text(&text).await;

        assert_eq!(report.original_chunk_count, 3);
        // 3 map calls + 1 reduce call
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.categories.len(), DEFAULT_CATEGORY_LABELS.len());
        assert_eq!(report.categories[0].label, "Technology");
        assert_eq!(report.entities.len(), 1);
        assert_eq!(service.metrics_snapshot().documents_analyzed, 1);
        assert_eq!(service.metrics_snapshot().capability_fallbacks, 0);
    }

    #[tokio::test]
    async fn map_results_keep_chunk_order_under_concurrency() {
        ensure_test_config();
        let service = AnalysisService::with_capabilities(
            Arc::new(TaggingSummarizer::new()),
            Arc::new(StubClassifier),
            Arc::new(StubExtractor),
        );

        // Three chunks; the tagging summarizer finishes later calls first.
        let text = document_text(&numbered_sentences(25));
        let report = service.analyze_text(&text).await;

        assert_eq!(report.final_summary, "<1-25>");
    }

    #[tokio::test]
    async fn reduce_step_sees_chunk_summaries_in_original_order() {
        ensure_test_config();
        let summarizer = Arc::new(TaggingSummarizer::new());
        let service = AnalysisService::with_capabilities(
            summarizer.clone(),
            Arc::new(StubClassifier),
            Arc::new(StubExtractor),
        );

        let text = document_text(&numbered_sentences(25));
        service.analyze_text(&text).await;

        let inputs = summarizer.inputs.lock().await;
        let reduce_input = inputs.last().expect("reduce call recorded");
        assert_eq!(reduce_input, "<1-10> <11-20> <21-25>");
    }

    #[tokio::test]
    async fn every_summarization_failure_degrades_to_original_text() {
        ensure_test_config();
        let service = AnalysisService::with_capabilities(
            Arc::new(FailingSummarizer),
            Arc::new(FailingClassifier),
            Arc::new(FailingExtractor),
        );

        let raw = numbered_sentences(25);
        let text = document_text(&raw);
        let report = service.analyze_text(&text).await;

        // Chunk fallbacks joined with a single space reproduce the sentence sequence.
        assert_eq!(report.final_summary, raw);
        assert!(report.categories.is_empty());
        assert!(report.entities.is_empty());
        assert_eq!(report.original_chunk_count, 3);
        // 3 map + 1 reduce + 1 classify + 1 extract
        assert_eq!(service.metrics_snapshot().capability_fallbacks, 6);
    }

    #[tokio::test]
    async fn text_without_sentences_yields_a_degenerate_report() {
        ensure_test_config();
        let service = AnalysisService::with_capabilities(
            Arc::new(FailingSummarizer),
            Arc::new(StubClassifier),
            Arc::new(StubExtractor),
        );

        // Punctuation only: extractable, but zero sentences and therefore zero chunks.
        let text = document_text("....");
        let report = service.analyze_text(&text).await;

        assert_eq!(report.original_chunk_count, 0);
        assert_eq!(report.final_summary, "");
        assert!(report.categories.is_empty());
        assert!(report.entities.is_empty());
        // Empty combined text short-circuits the reduce step, so nothing fell back.
        assert_eq!(service.metrics_snapshot().capability_fallbacks, 0);
    }

    #[tokio::test]
    async fn extraction_failure_reaches_no_capability() {
        ensure_test_config();
        let capability = Arc::new(UnreachableCapability);
        let service = AnalysisService::with_capabilities(
            capability.clone(),
            capability.clone(),
            capability,
        );

        let error = service
            .analyze_document(Document::plain_text("   ".into()))
            .await
            .expect_err("no extractable text");

        assert!(matches!(
            error,
            ProcessingError::Extraction(ExtractError::NoText)
        ));
        assert_eq!(service.metrics_snapshot().documents_analyzed, 0);
    }
}
