pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod tutors;

use std::sync::Arc;

use tutorlink_chat::ChatService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    /// Shared with the gateway, which consults it as the subscription
    /// access policy.
    pub service: Arc<ChatService>,
    pub jwt_secret: String,
}
