use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tutorlink_api::middleware::require_auth;
use tutorlink_api::{AppState, conversations, messages, tutors};
use tutorlink_gateway::{SubscriptionPolicy, connection};

/// Full application router: authenticated REST surface plus the
/// WebSocket gateway. Split out of `main` so integration tests can
/// serve the same router on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/conversations",
            post(conversations::resolve_conversation).get(conversations::list_conversations),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/tutors/me", put(tutors::upsert_tutor))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // The gateway authenticates via the Identify handshake instead of the
    // Authorization header, so it sits outside the auth middleware.
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    Router::new()
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.service.dispatcher().clone();
    let jwt_secret = state.jwt_secret.clone();
    // The messaging core decides who may watch a conversation.
    let policy: Arc<dyn SubscriptionPolicy> = state.service.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret, policy))
}
