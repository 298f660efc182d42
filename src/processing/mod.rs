//! Document analysis pipeline: sentence chunking and map-reduce orchestration.

pub mod chunking;
mod service;
pub mod types;

pub use service::{AnalysisApi, AnalysisService};
pub use types::{AnalysisReport, DEFAULT_CATEGORY_LABELS, ProcessingError};
