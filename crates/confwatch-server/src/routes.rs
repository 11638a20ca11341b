//! HTTP routes for the server.
//!
//! JSON endpoints answer errors with `{error, code}`; the two diff endpoints
//! return plain text, and the mutating endpoints return
//! `{success: false, error, code}`.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use confwatch_core::{CoreError, ErrorKind, WatchedFile};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route("/api/files", get(files))
        .route("/api/diff", get(diff))
        .route("/api/history", get(history))
        .route("/api/diff_between", get(diff_between))
        .route("/api/rollback", post(rollback))
        .route("/api/snapshot", post(snapshot))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: String,
}

impl ApiError {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(msg, "BAD_REQUEST")))
    }

    fn from_core(err: &CoreError) -> (StatusCode, Json<Self>) {
        (
            status_for(err.kind()),
            Json(Self::new(err.to_string(), err.kind().code())),
        )
    }
}

/// Body of a failed rollback or snapshot request.
#[derive(Debug, Serialize)]
struct ActionFailure {
    success: bool,
    error: String,
    code: String,
}

impl ActionFailure {
    fn new(status: StatusCode, error: impl Into<String>, code: &str) -> Response {
        let body = Self {
            success: false,
            error: error.into(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }

    fn from_core(err: &CoreError) -> Response {
        Self::new(status_for(err.kind()), err.to_string(), err.kind().code())
    }
}

#[derive(Debug, Serialize)]
struct ActionSuccess {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownFile | ErrorKind::NotFound | ErrorKind::NoHistory => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::AmbiguousHash | ErrorKind::InvalidTag => StatusCode::BAD_REQUEST,
        ErrorKind::Io | ErrorKind::Storage | ErrorKind::Config => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn text(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn text_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        msg.into(),
    )
        .into_response()
}

fn required(value: Option<String>, name: &str) -> Result<String, String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("Missing {} parameter", name))
}

// =============================================================================
// Meta endpoints
// =============================================================================

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

// =============================================================================
// File endpoints
// =============================================================================

#[derive(Debug, Serialize)]
struct FilesResponse {
    files: Vec<WatchedFile>,
}

async fn files(
    State(state): State<AppState>,
) -> Result<Json<FilesResponse>, (StatusCode, Json<ApiError>)> {
    let files = state
        .engine
        .files()
        .await
        .map_err(|e| ApiError::from_core(&e))?;
    Ok(Json(FilesResponse { files }))
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    file: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    hash: String,
    date: String,
    message: String,
    action: &'static str,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ApiError>)> {
    let file = required(query.file, "file").map_err(|msg| ApiError::bad_request(msg))?;

    let records = state
        .engine
        .history(&file)
        .await
        .map_err(|e| ApiError::from_core(&e))?;

    let history = records
        .into_iter()
        .map(|r| HistoryEntry {
            hash: r.hash.to_string(),
            date: r.date,
            message: r.message,
            action: r.action.as_str(),
        })
        .collect();

    Ok(Json(HistoryResponse { history }))
}

// =============================================================================
// Diff endpoints
// =============================================================================

async fn diff(State(state): State<AppState>, Query(query): Query<FileQuery>) -> Response {
    let file = match required(query.file, "file") {
        Ok(file) => file,
        Err(msg) => return text_error(StatusCode::BAD_REQUEST, msg),
    };

    match state.engine.diff_working(&file).await {
        Ok(diff) => text(diff),
        Err(e) => text_error(status_for(e.kind()), e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct DiffBetweenQuery {
    file: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

async fn diff_between(
    State(state): State<AppState>,
    Query(query): Query<DiffBetweenQuery>,
) -> Response {
    let params = required(query.file, "file").and_then(|file| {
        Ok((
            file,
            required(query.from, "from")?,
            required(query.to, "to")?,
        ))
    });
    let (file, from, to) = match params {
        Ok(params) => params,
        Err(msg) => return text_error(StatusCode::BAD_REQUEST, msg),
    };

    match state.engine.diff_between(&file, &from, &to).await {
        Ok(diff) => text(diff),
        Err(e) => text_error(status_for(e.kind()), e.to_string()),
    }
}

// =============================================================================
// Mutating endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct RollbackRequest {
    file: Option<String>,
    commit_hash: Option<String>,
}

async fn rollback(
    State(state): State<AppState>,
    body: Result<Json<RollbackRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ActionFailure::new(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
                "BAD_REQUEST",
            )
        }
    };

    let (file, hash) = match (
        required(request.file, "file"),
        required(request.commit_hash, "commit_hash"),
    ) {
        (Ok(file), Ok(hash)) => (file, hash),
        (Err(msg), _) | (_, Err(msg)) => {
            return ActionFailure::new(StatusCode::BAD_REQUEST, msg, "BAD_REQUEST")
        }
    };

    match state.engine.rollback(&file, &hash).await {
        Ok(outcome) => {
            info!(file = %file, hash = %outcome.restored, "Rollback via API");
            Json(ActionSuccess {
                success: true,
                message: outcome.message(),
                hash: Some(outcome.snapshot.hash.to_string()),
            })
            .into_response()
        }
        Err(e) => {
            warn!(file = %file, error = %e, "Rollback via API failed");
            ActionFailure::from_core(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotRequest {
    file: Option<String>,
    comment: Option<String>,
    #[serde(default)]
    force: bool,
}

async fn snapshot(
    State(state): State<AppState>,
    body: Result<Json<SnapshotRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ActionFailure::new(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
                "BAD_REQUEST",
            )
        }
    };

    let file = match required(request.file, "file") {
        Ok(file) => file,
        Err(msg) => return ActionFailure::new(StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
    };

    match state
        .engine
        .snapshot(&file, request.comment.as_deref(), request.force)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.is_created() {
                format!("Snapshot created for {}", file)
            } else {
                format!("No changes detected in {}", file)
            };
            Json(ActionSuccess {
                success: true,
                message,
                hash: Some(outcome.snapshot().hash.to_string()),
            })
            .into_response()
        }
        Err(e) => ActionFailure::from_core(&e),
    }
}
