use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SenderType;

/// Events pushed over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, display_name: String },

    /// Server confirms a conversation subscription is active; events for
    /// that conversation will flow from this point on.
    Subscribed { conversation_id: Uuid },

    /// A new message was appended to a conversation. Carries both
    /// participant ids so a mailbox-level watcher can filter the
    /// firehose without a lookup.
    MessageCreate {
        id: Uuid,
        conversation_id: Uuid,
        client_id: Uuid,
        tutor_id: Uuid,
        sender_type: SenderType,
        content: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },
}

impl ChatEvent {
    /// The conversation this event is scoped to, if any.
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { conversation_id, .. } => Some(*conversation_id),
            Self::Subscribed { conversation_id } => Some(*conversation_id),
            Self::Ready { .. } => None,
        }
    }

    /// Whether the given user is a participant in the event's conversation.
    /// Used by the coarse inbox/badge watcher.
    pub fn involves(&self, user_id: Uuid) -> bool {
        match self {
            Self::MessageCreate { client_id, tutor_id, .. } => {
                *client_id == user_id || *tutor_id == user_id
            }
            Self::Ready { .. } | Self::Subscribed { .. } => false,
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Follow live updates for a single conversation. Replaces any
    /// previous subscription on this connection — one open view at a time.
    Subscribe { conversation_id: Uuid },

    /// Stop following the current conversation.
    Unsubscribe,

    /// Receive every message event involving the authenticated user,
    /// regardless of conversation. Feeds the unread badge.
    WatchInbox,
}
