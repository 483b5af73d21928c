//! HTTP surface over a shared [`Session`].
//!
//! Routes:
//! - `POST /upload` multipart form with a `file` field
//! - `POST /ingest` `{"text": "..."}` for already-extracted text
//! - `POST /ask` and `POST /` `{"question": "..."}`
//! - `POST /reset`
//! - `GET /health`

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docqa_core::extractor;
use docqa_core::{DocQaError, IngestOutcome, IngestStatus, Session};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(ask_handler))
        .route("/ask", post(ask_handler))
        .route("/upload", post(upload_handler))
        .route("/ingest", post(ingest_handler))
        .route("/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(session: Arc<Session>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(AppState { session })).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub confidence: u8,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub success: bool,
    pub status: IngestStatus,
    pub fragments: usize,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(o: IngestOutcome) -> Self {
        Self {
            message: o.message,
            success: o.success,
            status: o.status,
            fragments: o.fragments,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn ask_handler(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Response {
    let question = match req.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "Question not provided"),
    };
    let result = state.session.ask(&question).await;
    Json(AskResponse {
        answer: result.text,
        confidence: result.confidence,
    })
    .into_response()
}

async fn ingest_text(state: &AppState, text: &str) -> Response {
    match state.session.ingest(text).await {
        Ok(outcome) => {
            let status = if outcome.success {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, Json(IngestResponse::from(outcome))).into_response()
        }
        Err(e) => {
            error!(error = %e, "ingest failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error while processing the uploaded document.",
            )
        }
    }
}

async fn ingest_handler(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Response {
    ingest_text(&state, &req.text).await
}

async fn upload_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return error_response(StatusCode::BAD_REQUEST, "Empty filename");
        }
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        };
        info!(file = %file_name, bytes = bytes.len(), "upload received");

        let text = match extract_upload(file_name.clone(), bytes.to_vec()).await {
            Ok(text) => text,
            Err(e @ DocQaError::Unsupported(_)) => {
                return error_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
            }
            Err(e) => {
                error!(error = %e, file = %file_name, "text extraction failed");
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Could not extract text from the uploaded file.",
                );
            }
        };
        return ingest_text(&state, &text).await;
    }
    error_response(StatusCode::BAD_REQUEST, "No file uploaded")
}

/// Writes the upload to a temp file carrying the original extension so the
/// extractor can pick a reader, then extracts off the async runtime.
async fn extract_upload(file_name: String, bytes: Vec<u8>) -> Result<String, DocQaError> {
    tokio::task::spawn_blocking(move || -> Result<String, DocQaError> {
        let suffix = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new().suffix(&suffix).tempfile()?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        extractor::extract_text(tmp.path())
    })
    .await
    .map_err(|e| DocQaError::Extraction(e.to_string()))?
}

async fn reset_handler(State(state): State<AppState>) -> Response {
    state.session.reset().await;
    StatusCode::NO_CONTENT.into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let version = state.session.version().await;
    Json(serde_json::json!({
        "status": "ok",
        "document_loaded": version.is_some(),
        "index_version": version,
    }))
    .into_response()
}
