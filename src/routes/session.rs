use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::dto::action_dto::Action;
use crate::dto::screen_dto::SessionEnvelope;
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_session(State(state): State<AppState>) -> Result<Response> {
    let (_, shared) = state.sessions.create().await;
    let session = shared.lock().await;
    Ok((StatusCode::CREATED, Json(SessionEnvelope::from(&*session))).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionEnvelope>> {
    let shared = state.sessions.get(id).await?;
    let session = shared.lock().await;
    Ok(Json(SessionEnvelope::from(&*session)))
}

#[axum::debug_handler]
pub async fn dispatch_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<SessionEnvelope>> {
    let action: Action = serde_json::from_slice(&body)?;
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    tracing::info!(session_id = %id, action = action.name(), stage = ?session.stage, "dispatching action");
    state.quiz_service.dispatch(&mut session, action).await?;
    Ok(Json(SessionEnvelope::from(&*session)))
}

/// Ends the session; an in-flight action for it finishes against a detached copy.
#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
