//! HTTP surface for Docsight.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /analyze` – Upload a document (multipart field `document`, `.pdf` or `.txt`),
//!   run the map-reduce analysis pipeline, and return the report
//!   (`final_summary`, `categories`, `entities`, `original_chunk_count`).
//! - `POST /analyze/text` – Analyze raw text submitted as JSON, same report shape.
//! - `GET /metrics` – Observe analysis counters and the last chunk count.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Handlers are generic over the [`AnalysisApi`] trait so they can be exercised against a
//! stub pipeline in tests. Failures follow one rule: only "could not read the source
//! document" is an error; a degraded-but-valid report is a success.

use crate::extract::{Document, DocumentFormat};
use crate::metrics::MetricsSnapshot;
use crate::processing::{AnalysisApi, AnalysisReport, ProcessingError};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/analyze", post(analyze_upload::<S>))
        .route("/analyze/text", post(analyze_text::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Analyze an uploaded document.
///
/// Accepts a multipart form with a `document` file field, infers the format from the
/// filename, and runs the pipeline on the upload bytes in memory. Unsupported file types and
/// malformed uploads are 400s; a document no text can be extracted from is a 422.
async fn analyze_upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError>
where
    S: AnalysisApi,
{
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("Malformed multipart upload: {error}")))?
    {
        if field.name() != Some("document") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::bad_request("No selected file"));
        }
        let format = DocumentFormat::from_filename(&filename).ok_or_else(|| {
            AppError::bad_request("Invalid file type. Please upload .pdf or .txt")
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::bad_request(format!("Failed to read upload: {error}")))?;
        tracing::info!(filename = %filename, bytes = bytes.len(), "Received document upload");
        document = Some(Document {
            bytes: bytes.to_vec(),
            format,
        });
        break;
    }

    let document = document.ok_or_else(|| AppError::bad_request("No file part"))?;
    let report = service.analyze_document(document).await?;
    tracing::info!(
        chunks = report.original_chunk_count,
        entities = report.entities.len(),
        "Analysis request completed"
    );
    Ok(Json(report))
}

/// Request body for the `POST /analyze/text` endpoint.
#[derive(Deserialize)]
struct AnalyzeTextRequest {
    /// Raw document text to analyze.
    text: String,
}

/// Analyze raw text without an upload round trip.
async fn analyze_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisReport>, AppError>
where
    S: AnalysisApi,
{
    let report = service
        .analyze_document(Document::plain_text(request.text))
        .await?;
    Ok(Json(report))
}

/// Return a concise metrics snapshot with analysis counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(serde::Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(serde::Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Upload a .pdf or .txt document (multipart field \"document\") and receive { \"final_summary\", \"categories\", \"entities\", \"original_chunk_count\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "analyze_text",
                method: "POST",
                path: "/analyze/text",
                description: "Analyze raw text without a file upload; same response shape as /analyze.",
                request_example: Some(json!({
                    "text": "Document contents"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return analysis counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Error envelope returned by every failing endpoint: `{"error": "..."}` with a status code.
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        // The pipeline only fails when no text could be extracted from the source.
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: inner.to_string(),
        }
    }
}
