use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use tutorlink_types::api::{Identity, UpsertTutorRequest};

use crate::AppState;
use crate::error::ApiError;

/// Put the caller into the tutor directory so clients can resolve
/// conversations with them.
pub async fn upsert_tutor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpsertTutorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = tokio::task::spawn_blocking(move || {
        state.service.register_tutor(&identity, &req.display_name)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(e)
    })??;

    Ok((StatusCode::OK, Json(profile)))
}
