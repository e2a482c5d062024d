use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use tutorlink_types::events::{ChatEvent, GatewayCommand};

use crate::dispatcher::{ConversationSubscription, Dispatcher, SubscriptionClosed};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Access policy for conversation subscriptions. The gateway itself has
/// no notion of conversation membership; the messaging core supplies it.
pub trait SubscriptionPolicy: Send + Sync {
    fn can_subscribe(&self, user_id: Uuid, conversation_id: Uuid) -> bool;
}

/// Handle a single WebSocket connection: Identify handshake, Ready event,
/// then a select loop relaying live updates until either side goes away.
///
/// Subscriptions are plain owned handles living in this function's frame,
/// so every exit path — disconnect, heartbeat timeout, channel shutdown —
/// drops and therefore cancels them. No leak to guard manually.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    jwt_secret: String,
    policy: Arc<dyn SubscriptionPolicy>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let (user_id, display_name) = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to gateway", display_name, user_id);

    // Step 2: Send Ready event
    let ready = ChatEvent::Ready {
        user_id,
        display_name: display_name.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    // At most one conversation view open per connection; Subscribe replaces
    // the previous handle, which unsubscribes it.
    let mut conversation_sub: Option<ConversationSubscription> = None;

    // Coarse mailbox firehose for the unread badge, filtered by participant.
    let mut inbox_rx: Option<broadcast::Receiver<ChatEvent>> = None;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;
    let mut pong_received = true;

    loop {
        tokio::select! {
            result = next_conversation_event(&mut conversation_sub) => {
                match result {
                    Ok(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(SubscriptionClosed) => {
                        warn!("live update channel closed, dropping connection");
                        break;
                    }
                }
            }

            result = next_inbox_event(&mut inbox_rx, user_id) => {
                match result {
                    Ok(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(SubscriptionClosed) => {
                        warn!("live update channel closed, dropping connection");
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                        Ok(GatewayCommand::Identify { .. }) => {} // Already handled

                        Ok(GatewayCommand::Subscribe { conversation_id }) => {
                            // Membership check is a blocking store lookup
                            let check = policy.clone();
                            let allowed = tokio::task::spawn_blocking(move || {
                                check.can_subscribe(user_id, conversation_id)
                            })
                            .await
                            .unwrap_or(false);

                            if !allowed {
                                warn!(
                                    "{} ({}) denied subscription to conversation {}",
                                    display_name, user_id, conversation_id
                                );
                                continue;
                            }

                            info!("{} ({}) subscribing to conversation {}",
                                display_name, user_id, conversation_id);
                            conversation_sub = Some(dispatcher.subscribe(conversation_id));

                            let ack = ChatEvent::Subscribed { conversation_id };
                            if send_event(&mut sender, &ack).await.is_err() {
                                break;
                            }
                        }

                        Ok(GatewayCommand::Unsubscribe) => {
                            conversation_sub = None;
                        }

                        Ok(GatewayCommand::WatchInbox) => {
                            info!("{} ({}) watching inbox", display_name, user_id);
                            inbox_rx = Some(dispatcher.subscribe_events());
                        }

                        Err(e) => {
                            warn!(
                                "{} ({}) bad command: {} -- raw: {}",
                                display_name,
                                user_id,
                                e,
                                truncate_for_log(&text, 200)
                            );
                        }
                    },
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            _ = heartbeat.tick() => {
                if pong_received {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                pong_received = false;
                if sender.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("{} ({}) disconnected from gateway", display_name, user_id);
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ChatEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap();
    sender.send(Message::Text(text.into())).await
}

/// Next event for the currently open conversation view, or pend forever
/// when no view is open.
async fn next_conversation_event(
    sub: &mut Option<ConversationSubscription>,
) -> Result<ChatEvent, SubscriptionClosed> {
    match sub {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// Next firehose event involving this user, or pend forever when the
/// inbox watch is off.
async fn next_inbox_event(
    rx: &mut Option<broadcast::Receiver<ChatEvent>>,
    user_id: Uuid,
) -> Result<ChatEvent, SubscriptionClosed> {
    match rx {
        Some(rx) => loop {
            match rx.recv().await {
                Ok(event) if event.involves(user_id) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("inbox watch for {} lagged by {} events", user_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionClosed),
            }
        },
        None => std::future::pending().await,
    }
}

/// Clip a client-supplied frame for logging without splitting a
/// multi-byte character (slicing at an arbitrary byte index panics).
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(Uuid, String)> {
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use tutorlink_types::api::Claims;

    let timeout = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some((token_data.claims.sub, token_data.claims.name));
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}
