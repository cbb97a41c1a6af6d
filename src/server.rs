//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/ask` | Answer a question from the stored documents |
//! | `POST` | `/chunk` | Chunk a text body with the configured splitter |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `generation_disabled` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docqa_core::pipeline::{answer_question, Answer};

use crate::config::{Config, RetrievalConfig};
use crate::credentials::Credentials;
use crate::services::Services;

#[derive(Clone)]
struct AppState {
    services: Services,
    retrieval: RetrievalConfig,
}

/// Build providers from config and serve on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config, creds: &Credentials) -> anyhow::Result<()> {
    let services = Services::from_config(config, creds).await?;
    run_server_with_services(config, services).await
}

/// Serve with caller-supplied collaborators.
pub async fn run_server_with_services(config: &Config, services: Services) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(services, config.retrieval.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("docqa server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// The application router, without binding a socket.
pub fn router(services: Services, retrieval: RetrievalConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ask", post(handle_ask))
        .route("/chunk", post(handle_chunk))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            services,
            retrieval,
        })
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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn disabled(code: &'static str, err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code,
        message: err.to_string(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    top_k: Option<usize>,
    /// Restrict retrieval to one document's source name.
    source: Option<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    if req.top_k == Some(0) {
        return Err(bad_request("top_k must be >= 1"));
    }

    let services = &state.services;
    let embedder = services
        .embedder()
        .map_err(|e| disabled("embeddings_disabled", e))?;
    let generator = services
        .generator()
        .map_err(|e| disabled("generation_disabled", e))?;

    let opts = state.retrieval.answer_options(req.top_k, req.source);
    let answer = answer_question(
        services.store.as_ref(),
        embedder,
        generator,
        &req.question,
        &opts,
    )
    .await
    .map_err(internal)?;

    Ok(Json(answer))
}

// ============ POST /chunk ============

#[derive(Deserialize)]
struct ChunkRequest {
    text: String,
    target_size: Option<usize>,
    overlap_size: Option<usize>,
}

#[derive(Serialize)]
struct ChunkResponse {
    count: usize,
    target_size: usize,
    overlap_size: usize,
    chunks: Vec<String>,
}

async fn handle_chunk(
    State(state): State<AppState>,
    Json(req): Json<ChunkRequest>,
) -> Result<Json<ChunkResponse>, AppError> {
    let base = &state.services.chunker;
    let target_size = req.target_size.unwrap_or(base.target_size());
    let overlap_size = req.overlap_size.unwrap_or(base.overlap_size());
    if target_size == 0 {
        return Err(bad_request("target_size must be > 0"));
    }
    if overlap_size >= target_size {
        return Err(bad_request(format!(
            "overlap_size ({}) must be smaller than target_size ({})",
            overlap_size, target_size
        )));
    }

    let chunks = base
        .with_sizes(target_size, overlap_size)
        .chunk(&req.text)
        .await
        .map_err(internal)?;

    Ok(Json(ChunkResponse {
        count: chunks.len(),
        target_size,
        overlap_size,
        chunks,
    }))
}
