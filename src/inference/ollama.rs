//! Ollama-backed implementation of the inference capabilities.
//!
//! All three capabilities are served by one HTTP client issuing non-streaming requests to the
//! runtime's `/api/generate` endpoint. Summaries come back as free text; classification and
//! entity extraction ask the model for JSON (`format: "json"`) and parse the reply, treating
//! anything unparseable as an [`InferenceError`] for the pipeline to degrade on.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::get_config;

use super::{CategoryScore, Classifier, Entity, EntityExtractor, InferenceError, Summarizer};

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARY_MAX_WORDS: usize = 120;

/// Inference client backed by a local Ollama runtime.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    summarizer_model: String,
    classifier_model: String,
    extractor_model: String,
    summary_max_words: usize,
}

/// Build the inference client from process configuration.
pub fn get_inference_client() -> Arc<OllamaClient> {
    let config = get_config();
    let base_url = config
        .ollama_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    Arc::new(OllamaClient::new(
        base_url,
        config.summarizer_model.clone(),
        config.classifier_model.clone(),
        config.extractor_model.clone(),
        config.summary_max_words,
    ))
}

impl OllamaClient {
    /// Construct a client for the runtime at `base_url`.
    ///
    /// Classification and extraction fall back to the summarizer model when no dedicated
    /// model is configured.
    pub fn new(
        base_url: String,
        summarizer_model: String,
        classifier_model: Option<String>,
        extractor_model: Option<String>,
        summary_max_words: Option<usize>,
    ) -> Self {
        let http = Client::builder()
            .user_agent("docsight/inference")
            .build()
            .expect("Failed to construct reqwest::Client for inference");
        let classifier_model = classifier_model.unwrap_or_else(|| summarizer_model.clone());
        let extractor_model = extractor_model.unwrap_or_else(|| summarizer_model.clone());
        Self {
            http,
            base_url,
            summarizer_model,
            classifier_model,
            extractor_model,
            summary_max_words: summary_max_words.unwrap_or(DEFAULT_SUMMARY_MAX_WORDS),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    /// Issue one non-streaming generation request and return the raw completion text.
    async fn generate(
        &self,
        model: &str,
        prompt: String,
        json_output: bool,
    ) -> Result<String, InferenceError> {
        let mut payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                // Lower temperature for reproducible analysis output.
                "temperature": 0.1,
            }
        });
        if json_output {
            payload["format"] = json!("json");
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(InferenceError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            InferenceError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(InferenceError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, text: &str) -> Result<String, InferenceError> {
        let prompt = format!(
            "Summarize the following text in at most {} words. \
             Respond with the summary only, no preamble.\n\n{}",
            self.summary_max_words, text
        );
        self.generate(&self.summarizer_model, prompt, false).await
    }
}

#[async_trait]
impl Classifier for OllamaClient {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<CategoryScore>, InferenceError> {
        if text.trim().is_empty() || labels.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Rate how well each candidate label describes the text. \
             Respond with a JSON object mapping every label to a score between 0 and 1.\n\
             Labels: {}\n\nText:\n{}",
            labels.join(", "),
            text
        );
        let raw = self.generate(&self.classifier_model, prompt, true).await?;
        let scores: serde_json::Map<String, serde_json::Value> = parse_json_reply(&raw)?;

        // One score per label, in the caller's label order; unscored labels read as 0.
        Ok(labels
            .iter()
            .map(|label| CategoryScore {
                label: label.clone(),
                score: scores.get(label).and_then(|v| v.as_f64()).unwrap_or(0.0),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(rename = "type")]
    entity_type: String,
    text: String,
}

#[async_trait]
impl EntityExtractor for OllamaClient {
    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, InferenceError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Extract the named entities (people, organizations, locations, products, dates) \
             from the text. Respond with a JSON object containing an \"entities\" array; each \
             element has a \"type\" field (PER, ORG, LOC, MISC) and a \"text\" field with the \
             exact span.\n\nText:\n{}",
            text
        );
        let raw = self.generate(&self.extractor_model, prompt, true).await?;
        let reply: EntitiesReply = parse_json_reply(&raw)?;

        Ok(reply
            .entities
            .into_iter()
            .map(|entity| Entity {
                entity_type: entity.entity_type,
                surface_text: entity.text,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct EntitiesReply {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

/// Decode a model reply that is expected to be JSON.
///
/// With `format: "json"` the runtime returns bare JSON, but smaller models occasionally wrap
/// it in prose; when direct parsing fails, retry on the outermost braced span before giving up.
fn parse_json_reply<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, InferenceError> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let candidate = trimmed
                .find('{')
                .zip(trimmed.rfind('}'))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &trimmed[start..=end]);
            match candidate {
                Some(span) => serde_json::from_str(span).map_err(|_| {
                    InferenceError::InvalidResponse(format!(
                        "model reply is not valid JSON: {first_error}"
                    ))
                }),
                None => Err(InferenceError::InvalidResponse(format!(
                    "model reply is not valid JSON: {first_error}"
                ))),
            }
        }
    }
}
