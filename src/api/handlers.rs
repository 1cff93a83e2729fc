//! HTTP request handlers

use super::types::{
    AbandonResponse, CreateSessionResponse, ErrorResponse, RecordListResponse, SessionResponse,
    TurnRequest,
};
use super::AppState;
use crate::session::{RouterError, TurnReply};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/turn", post(send_turn))
        .route("/api/sessions/:id/abandon", post(abandon_session))
        .route("/api/records", get(list_records))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Handlers
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let reply = state.router.resume(&session_id, None).await?;
    Ok(Json(CreateSessionResponse { session_id, reply }))
}

async fn send_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnReply>, AppError> {
    let reply = state.router.resume(&id, req.text).await?;
    Ok(Json(reply))
}

async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AbandonResponse>, AppError> {
    if state.router.abandon(&id).await? {
        Ok(Json(AbandonResponse { abandoned: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let status = state
        .router
        .status(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;
    Ok(Json(SessionResponse {
        session_id: id,
        status,
    }))
}

// ============================================================
// Records
// ============================================================

async fn list_records(State(state): State<AppState>) -> Result<Json<RecordListResponse>, AppError> {
    let records = state
        .db
        .list_records()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(RecordListResponse { records }))
}

async fn get_version() -> &'static str {
    concat!("clinic-intake ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<RouterError> for AppError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::Structural { .. } => AppError::BadRequest(err.to_string()),
            RouterError::Storage(_) | RouterError::EmptyTurn(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
