//! End-to-end WebSocket gateway tests: real server on an ephemeral port,
//! real client connections over tokio-tungstenite.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use tutorlink_api::{AppState, AppStateInner};
use tutorlink_chat::ChatService;
use tutorlink_db::Database;
use tutorlink_gateway::Dispatcher;
use tutorlink_types::api::{Claims, Identity};
use tutorlink_types::events::ChatEvent;
use tutorlink_types::models::SenderType;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JWT_SECRET: &str = "gateway-test-secret";

fn identity(name: &str) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: format!("{name}@example.com"),
        display_name: name.to_string(),
    }
}

fn token_for(identity: &Identity) -> String {
    let claims = Claims {
        sub: identity.id,
        email: identity.email.clone(),
        name: identity.display_name.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Serve the full application router on an ephemeral port, backed by an
/// in-memory store. Returns the bound address and a handle on the service
/// for driving writes from the test side.
async fn spawn_app() -> (SocketAddr, Arc<ChatService>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let service = Arc::new(ChatService::new(db, Dispatcher::new()));
    let state: AppState = Arc::new(AppStateInner {
        service: service.clone(),
        jwt_secret: JWT_SECRET.to_string(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = tutorlink_server::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, service)
}

/// Connect, run the Identify handshake, and assert the Ready event.
async fn connect(addr: SocketAddr, who: &Identity) -> Ws {
    let (mut ws, _) = connect_async(format!("ws://{addr}/gateway")).await.unwrap();

    let identify = serde_json::json!({
        "type": "Identify",
        "data": { "token": token_for(who) },
    });
    ws.send(Message::Text(identify.to_string().into()))
        .await
        .unwrap();

    match next_event(&mut ws, Duration::from_secs(2)).await {
        Some(ChatEvent::Ready { user_id, .. }) => assert_eq!(user_id, who.id),
        other => panic!("expected Ready, got {other:?}"),
    }

    ws
}

/// Next chat event within `wait`, or None on timeout. Skips control frames.
async fn next_event(ws: &mut Ws, wait: Duration) -> Option<ChatEvent> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        if let Ok(Message::Text(text)) = frame {
            return Some(serde_json::from_str(&text).unwrap());
        }
    }
}

async fn send_subscribe(ws: &mut Ws, conversation_id: Uuid) {
    let subscribe = serde_json::json!({
        "type": "Subscribe",
        "data": { "conversation_id": conversation_id },
    });
    ws.send(Message::Text(subscribe.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn participant_streams_live_updates_for_their_conversation() {
    let (addr, service) = spawn_app().await;

    let client = identity("ada");
    let tutor = identity("reyes");
    service.register_tutor(&tutor, "reyes").unwrap();
    let conversation = service.resolve(&client, tutor.id).unwrap();

    let mut ws = connect(addr, &tutor).await;
    send_subscribe(&mut ws, conversation.id).await;

    match next_event(&mut ws, Duration::from_secs(2)).await {
        Some(ChatEvent::Subscribed { conversation_id }) => {
            assert_eq!(conversation_id, conversation.id);
        }
        other => panic!("expected Subscribed, got {other:?}"),
    }

    let sent = {
        let service = service.clone();
        let client = client.clone();
        let conversation_id = conversation.id;
        tokio::task::spawn_blocking(move || {
            service.append(&client, conversation_id, "see you at four")
        })
        .await
        .unwrap()
        .unwrap()
    };

    match next_event(&mut ws, Duration::from_secs(2)).await {
        Some(ChatEvent::MessageCreate { id, content, sender_type, .. }) => {
            assert_eq!(id, sent.id);
            assert_eq!(content, "see you at four");
            assert_eq!(sender_type, SenderType::Client);
        }
        other => panic!("expected MessageCreate, got {other:?}"),
    }
}

#[tokio::test]
async fn non_participant_subscription_is_refused_and_receives_nothing() {
    let (addr, service) = spawn_app().await;

    let client = identity("ada");
    let tutor = identity("reyes");
    let mallory = identity("mallory");
    service.register_tutor(&tutor, "reyes").unwrap();
    let conversation = service.resolve(&client, tutor.id).unwrap();

    let mut ws = connect(addr, &mallory).await;
    send_subscribe(&mut ws, conversation.id).await;

    // No ack for an outsider.
    assert!(next_event(&mut ws, Duration::from_millis(300)).await.is_none());

    {
        let service = service.clone();
        let client = client.clone();
        let conversation_id = conversation.id;
        tokio::task::spawn_blocking(move || {
            service.append(&client, conversation_id, "just between us")
        })
        .await
        .unwrap()
        .unwrap();
    }

    // And no leaked message either.
    assert!(next_event(&mut ws, Duration::from_millis(300)).await.is_none());
}
