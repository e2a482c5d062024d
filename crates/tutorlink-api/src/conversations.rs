use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use tutorlink_types::api::{Identity, ResolveConversationRequest};
use tutorlink_types::models::SenderType;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    /// Which side of the relationship to list conversations for.
    pub role: SenderType,
}

/// Find-or-create the conversation between the caller and a tutor.
pub async fn resolve_conversation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ResolveConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB work off the async runtime
    let conversation = tokio::task::spawn_blocking(move || {
        state.service.resolve(&identity, req.tutor_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(e)
    })??;

    Ok((StatusCode::OK, Json(conversation)))
}

/// Recency-ordered inbox with last message and unread count per entry.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<InboxQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = tokio::task::spawn_blocking(move || {
        state.service.inbox(&identity, query.role)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(e)
    })??;

    Ok(Json(summaries))
}
