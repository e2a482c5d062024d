use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use tutorlink_chat::ChatError;
use tutorlink_types::api::{Claims, Identity};

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token issued by the external auth
/// provider, then hand the decoded `Identity` to the handlers as an
/// extension. Anything short of a valid token is `NotAuthenticated`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ChatError::NotAuthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ChatError::NotAuthenticated)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ChatError::NotAuthenticated)?;

    req.extensions_mut().insert(Identity::from(token_data.claims));
    Ok(next.run(req).await)
}
