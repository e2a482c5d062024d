use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

use tutorlink_types::events::ChatEvent;

/// The live update channel has shut down; no further deliveries will arrive.
#[derive(Debug, Error)]
#[error("live update channel closed")]
pub struct SubscriptionClosed;

/// Fan-out hub for chat events. Appends publish here; open conversation
/// views and inbox watchers subscribe.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Single firehose — per-conversation scoping happens on the
    /// subscriber side. Delivery order matches publish order.
    events_tx: broadcast::Sender<ChatEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { events_tx }),
        }
    }

    /// Publish an event to all active subscribers. Best-effort: an event
    /// with no subscribers is simply dropped.
    pub fn publish(&self, event: ChatEvent) {
        match self.inner.events_tx.send(event) {
            Ok(n) => trace!("event delivered to {} subscribers", n),
            Err(_) => trace!("event dropped, no active subscribers"),
        }
    }

    /// Raw firehose of every event. Used for the coarse inbox/unread
    /// badge signal; consumers filter by participant themselves.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Scoped subscription for a single conversation. Dropping the handle
    /// cancels the subscription and releases the underlying receiver.
    pub fn subscribe(&self, conversation_id: Uuid) -> ConversationSubscription {
        ConversationSubscription {
            conversation_id,
            rx: self.inner.events_tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.events_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A live view onto one conversation. Each event belonging to the
/// conversation is yielded exactly once, in publish order, until the
/// handle is dropped.
#[derive(Debug)]
pub struct ConversationSubscription {
    conversation_id: Uuid,
    rx: broadcast::Receiver<ChatEvent>,
}

impl ConversationSubscription {
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Next event for this conversation. A lagged receiver skips ahead
    /// (best-effort delivery) rather than erroring out.
    pub async fn recv(&mut self) -> Result<ChatEvent, SubscriptionClosed> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.conversation_id() == Some(self.conversation_id) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        "subscription for conversation {} lagged by {} events",
                        self.conversation_id, n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionClosed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tutorlink_types::models::SenderType;

    fn message_event(conversation_id: Uuid, content: &str) -> ChatEvent {
        ChatEvent::MessageCreate {
            id: Uuid::new_v4(),
            conversation_id,
            client_id: Uuid::new_v4(),
            tutor_id: Uuid::new_v4(),
            sender_type: SenderType::Client,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_publish_order() {
        let dispatcher = Dispatcher::new();
        let conversation_id = Uuid::new_v4();
        let mut sub = dispatcher.subscribe(conversation_id);

        dispatcher.publish(message_event(conversation_id, "one"));
        dispatcher.publish(message_event(conversation_id, "two"));

        for expected in ["one", "two"] {
            let event = sub.recv().await.unwrap();
            match event {
                ChatEvent::MessageCreate { content, .. } => assert_eq!(content, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn events_for_other_conversations_are_filtered_out() {
        let dispatcher = Dispatcher::new();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let mut sub = dispatcher.subscribe(mine);

        dispatcher.publish(message_event(theirs, "not for you"));
        dispatcher.publish(message_event(mine, "for you"));

        let event = sub.recv().await.unwrap();
        match event {
            ChatEvent::MessageCreate { conversation_id, content, .. } => {
                assert_eq!(conversation_id, mine);
                assert_eq!(content, "for you");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Only the scoped event arrived; nothing else is pending.
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_the_subscription() {
        let dispatcher = Dispatcher::new();
        let conversation_id = Uuid::new_v4();

        let sub = dispatcher.subscribe(conversation_id);
        assert_eq!(dispatcher.subscriber_count(), 1);

        drop(sub);
        assert_eq!(dispatcher.subscriber_count(), 0);

        // Publishing after cancellation delivers to no one.
        dispatcher.publish(message_event(conversation_id, "into the void"));
    }
}
