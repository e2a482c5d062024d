use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims carried in the bearer tokens issued by the external auth provider.
/// Canonical definition lives here so the REST middleware and the WebSocket
/// gateway decode the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

/// The authenticated caller, decoded from validated claims. Passed
/// explicitly into every domain operation — there is no ambient session.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            display_name: claims.name,
        }
    }
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConversationRequest {
    pub tutor_id: Uuid,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

// -- Tutors --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertTutorRequest {
    pub display_name: String,
}
