use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use tutorlink_types::api::{Identity, SendMessageRequest};

use crate::AppState;
use crate::error::ApiError;

/// Append a message. The sender role comes from the caller's membership
/// in the conversation, not from the request body.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB insert off the async runtime
    let message = tokio::task::spawn_blocking(move || {
        state.service.append(&identity, conversation_id, &req.content)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(e)
    })??;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Full transcript, ascending by creation time.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = tokio::task::spawn_blocking(move || {
        state.service.list(&identity, conversation_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(e)
    })??;

    Ok(Json(messages))
}
