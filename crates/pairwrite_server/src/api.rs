//! Route table and request handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use log::{error, warn};
use pairwrite_core::{PairDraft, PairId, PairValues, PairWriter, WriteError, WriteResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const INSERT_OK: &str = "transaction succeeded (insert)";
pub const EDIT_OK: &str = "transaction succeeded (edit)";
pub const DELETE_OK: &str = "transaction succeeded (delete)";

/// Shared handler state; the writer holds only immutable config.
#[derive(Clone)]
pub struct AppState {
    writer: Arc<PairWriter>,
}

impl AppState {
    pub fn new(writer: PairWriter) -> Self {
        Self {
            writer: Arc::new(writer),
        }
    }
}

/// JSON body returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Generated pair key, present on successful inserts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PairId>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error: None,
            id: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            message: None,
            error: Some(error.into()),
            id: None,
        }
    }

    fn with_id(mut self, id: PairId) -> Self {
        self.id = Some(id);
        self
    }
}

type Reply = (StatusCode, Json<ApiResponse>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/insert-data", post(insert_pair))
        .route("/api/edit-data/:id", put(edit_pair))
        .route("/api/delete-data/:id", delete(delete_pair))
        .with_state(state)
}

pub async fn healthz() -> Reply {
    (StatusCode::OK, Json(ApiResponse::success("ok")))
}

pub async fn insert_pair(
    State(state): State<AppState>,
    body: Result<Json<PairDraft>, JsonRejection>,
) -> Reply {
    let values = match parse_body(body) {
        Ok(values) => values,
        Err(reply) => return reply,
    };

    let writer = Arc::clone(&state.writer);
    match run_blocking(move || writer.insert(&values)).await {
        Ok(id) => (
            StatusCode::OK,
            Json(ApiResponse::success(INSERT_OK).with_id(id)),
        ),
        Err(reply) => reply,
    }
}

pub async fn edit_pair(
    State(state): State<AppState>,
    id: Result<Path<PairId>, PathRejection>,
    body: Result<Json<PairDraft>, JsonRejection>,
) -> Reply {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let values = match parse_body(body) {
        Ok(values) => values,
        Err(reply) => return reply,
    };

    let writer = Arc::clone(&state.writer);
    match run_blocking(move || writer.edit(id, &values)).await {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::success(EDIT_OK))),
        Err(reply) => reply,
    }
}

pub async fn delete_pair(
    State(state): State<AppState>,
    id: Result<Path<PairId>, PathRejection>,
) -> Reply {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(reply) => return reply,
    };

    let writer = Arc::clone(&state.writer);
    match run_blocking(move || writer.delete(id)).await {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::success(DELETE_OK))),
        Err(reply) => reply,
    }
}

fn parse_id(id: Result<Path<PairId>, PathRejection>) -> Result<PairId, Reply> {
    match id {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            warn!(
                "event=request_rejected module=api reason=path error={}",
                rejection.body_text()
            );
            Err(bad_request("id must be an integer"))
        }
    }
}

fn parse_body(body: Result<Json<PairDraft>, JsonRejection>) -> Result<PairValues, Reply> {
    let draft = match body {
        Ok(Json(draft)) => draft,
        Err(rejection) => {
            warn!(
                "event=request_rejected module=api reason=body error={}",
                rejection.body_text()
            );
            return Err(bad_request(rejection.body_text()));
        }
    };
    draft.validate().map_err(|err| bad_request(err.to_string()))
}

fn bad_request(error: impl Into<String>) -> Reply {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::failure(error)))
}

async fn run_blocking<T, F>(job: F) -> Result<T, Reply>
where
    T: Send + 'static,
    F: FnOnce() -> WriteResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(write_failure(&err)),
        Err(join_err) => {
            error!(
                "event=blocking_task module=api status=error error={}",
                join_err
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure("internal error")),
            ))
        }
    }
}

fn write_failure(err: &WriteError) -> Reply {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::failure(err.client_message())))
}
