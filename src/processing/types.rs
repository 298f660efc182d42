//! Core data types and error definitions for the analysis pipeline.

use serde::Serialize;
use serde::ser::SerializeMap;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::inference::{CategoryScore, Entity};

/// Candidate labels scored when no override is configured.
pub const DEFAULT_CATEGORY_LABELS: [&str; 6] = [
    "Technology",
    "Business",
    "Legal",
    "Finance",
    "Academic Paper",
    "Marketing",
];

/// Errors emitted by the document analysis pipeline.
///
/// Capability failures never appear here; they degrade in place inside the pipeline. The only
/// way an analysis request fails outright is when no text could be extracted from the source.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Source document yielded no text; nothing to analyze.
    #[error("{0}")]
    Extraction(#[from] ExtractError),
}

/// Terminal record of one analyzed document. Immutable once assembled.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// The reduced summary all downstream analysis was run on.
    pub final_summary: String,
    /// Label scores, serialized as a JSON map in input label order.
    #[serde(serialize_with = "serialize_categories")]
    pub categories: Vec<CategoryScore>,
    /// Recognized entities, each serialized as `{"<type>": "<text>"}`.
    pub entities: Vec<Entity>,
    /// Number of chunks the source document was split into.
    pub original_chunk_count: usize,
}

fn serialize_categories<S>(categories: &[CategoryScore], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut map = serializer.serialize_map(Some(categories.len()))?;
    for category in categories {
        map.serialize_entry(&category.label, &category.score)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_categories_as_ordered_map() {
        let report = AnalysisReport {
            final_summary: "A summary.".into(),
            categories: vec![
                CategoryScore {
                    label: "Technology".into(),
                    score: 0.9,
                },
                CategoryScore {
                    label: "Business".into(),
                    score: 0.4,
                },
            ],
            entities: vec![Entity {
                entity_type: "ORG".into(),
                surface_text: "Acme".into(),
            }],
            original_chunk_count: 3,
        };

        let json = serde_json::to_string(&report).expect("serialize");
        // label order in the JSON text matches input order
        assert!(json.find("Technology").unwrap() < json.find("Business").unwrap());

        let value: serde_json::Value = serde_json::from_str(&json).expect("round trip");
        assert_eq!(value["categories"]["Technology"], 0.9);
        assert_eq!(value["entities"][0]["ORG"], "Acme");
        assert_eq!(value["original_chunk_count"], 3);
    }
}
