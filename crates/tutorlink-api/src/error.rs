use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use tutorlink_chat::ChatError;

/// Newtype so the domain taxonomy can carry an HTTP mapping without the
/// domain crate knowing about axum.
pub struct ApiError(ChatError);

impl ApiError {
    /// Wrap an infrastructure failure (e.g. a blocking-task join error)
    /// as a storage outage.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self(ChatError::StoreUnavailable(err.into()))
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ChatError::CounterpartyNotFound | ChatError::ConversationNotFound => {
                StatusCode::NOT_FOUND
            }
            ChatError::EmptyContent => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::UnauthorizedSender => StatusCode::FORBIDDEN,
            ChatError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChatError::ChannelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!("request failed: {:?}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
