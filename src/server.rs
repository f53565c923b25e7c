//! HTTP API server.
//!
//! Thin axum glue over [`DocService`]: each handler parses its request,
//! calls one service operation and serializes the outcome.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check (returns version) |
//! | `POST` | `{prefix}/upload` | Multipart PDF upload (field `file`) |
//! | `POST` | `{prefix}/extract` | Extract text from an uploaded PDF |
//! | `POST` | `{prefix}/summarize` | Map-reduce summary of the extracted text |
//! | `POST` | `{prefix}/index` | Chunk, embed and index the extracted text |
//! | `POST` | `{prefix}/ask` | Answer a question from the index |
//! | `GET`  | `{prefix}/documents/{id}` | Which artifacts exist |
//! | `GET`  | `{prefix}/documents/{id}/summary` | Last persisted summary |
//!
//! `{prefix}` is `[server].api_prefix`, `/api` by default.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Vector index not found for document abc. Build the index first." } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `payload_too_large` | 413 |
//! | `not_found` | 404 |
//! | `auth` | 401 |
//! | `remote` | 502 |
//! | `storage` | 500 |

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_core::models::{DocumentId, RagConfig};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::extract::is_pdf_content_type;
use crate::service::DocService;

/// Request bodies may carry a multipart envelope around the upload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
struct AppState {
    service: Arc<DocService>,
}

/// Start the server on `[server].bind` and run until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = DocService::from_config(config).context("failed to initialize services")?;
    let app = build_router(config, Arc::new(service))?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, prefix = %config.server.api_prefix, "docqa server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Build the router for `service`. Exposed for tests and embedding.
pub fn build_router(config: &Config, service: Arc<DocService>) -> anyhow::Result<Router> {
    let prefix = config.server.api_prefix.trim_end_matches('/');
    let body_limit = service.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    let api = Router::new()
        .route(&format!("{prefix}/upload"), post(handle_upload))
        .route(&format!("{prefix}/extract"), post(handle_extract))
        .route(&format!("{prefix}/summarize"), post(handle_summarize))
        .route(&format!("{prefix}/index"), post(handle_index))
        .route(&format!("{prefix}/ask"), post(handle_ask))
        .route(&format!("{prefix}/documents/{{id}}"), get(handle_status))
        .route(
            &format!("{prefix}/documents/{{id}}/summary"),
            get(handle_get_summary),
        );

    Ok(Router::new()
        .route("/health", get(handle_health))
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&config.server.cors_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service }))
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {}", o))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<docqa_core::Error> for AppError {
    fn from(err: docqa_core::Error) -> Self {
        use docqa_core::Error;
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Remote(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = err.kind(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn payload_too_large(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large".to_string(),
        message: message.into(),
    }
}

fn parse_id(raw: &str) -> Result<DocumentId, AppError> {
    Ok(DocumentId::parse(raw)?)
}

// ============ Handlers ============

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "app": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_bytes = state.service.max_upload_bytes();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or("").to_string();
        if !is_pdf_content_type(&content_type) {
            return Err(bad_request("Only PDF files are allowed."));
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err(payload_too_large(format!(
                "File too large. Max {} MB.",
                max_bytes / (1024 * 1024)
            )));
        }

        let outcome = state.service.upload(filename, &bytes).await?;
        return Ok(Json(outcome));
    }

    Err(bad_request("multipart field 'file' is required"))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        payload_too_large(err.body_text())
    } else {
        bad_request(err.body_text())
    }
}

#[derive(Deserialize)]
struct DocumentRequest {
    document_id: String,
}

#[derive(Deserialize)]
struct ExtractRequest {
    document_id: String,
    max_pages: Option<usize>,
}

async fn handle_extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let id = parse_id(&req.document_id)?;
    let max_pages = req
        .max_pages
        .unwrap_or_else(|| state.service.default_max_pages());
    Ok(Json(state.service.extract(&id, max_pages).await?))
}

async fn handle_summarize(
    State(state): State<AppState>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let id = parse_id(&req.document_id)?;
    Ok(Json(state.service.summarize(&id).await?))
}

/// Omitted chunking fields fall back to the configured `[rag]` defaults.
#[derive(Deserialize)]
struct IndexRequest {
    document_id: String,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    max_chunks: Option<usize>,
}

async fn handle_index(
    State(state): State<AppState>,
    payload: Result<Json<IndexRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let id = parse_id(&req.document_id)?;
    let defaults = state.service.default_rag_config();
    let config = RagConfig {
        chunk_size: req.chunk_size.unwrap_or(defaults.chunk_size),
        chunk_overlap: req.chunk_overlap.unwrap_or(defaults.chunk_overlap),
        max_chunks: req.max_chunks.unwrap_or(defaults.max_chunks),
    };
    Ok(Json(state.service.build_index(&id, Some(config)).await?))
}

#[derive(Deserialize)]
struct AskRequest {
    document_id: String,
    question: String,
    top_k: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let id = parse_id(&req.document_id)?;
    let top_k = req.top_k.unwrap_or_else(|| state.service.default_top_k());
    Ok(Json(state.service.ask(&id, &req.question, top_k).await?))
}

async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.status(&id).await?))
}

async fn handle_get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.summary(&id).await?))
}
