use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of a conversation a participant (or message author) is on.
/// Doubles as the inbox role selector: a user browses their inbox either
/// as the client or as the tutor of their conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Client,
    Tutor,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Tutor => "tutor",
        }
    }

    /// The opposite side. Used by the inbox unread count, which counts
    /// messages authored by the other party.
    pub fn other(&self) -> Self {
        match self {
            Self::Client => Self::Tutor,
            Self::Tutor => Self::Client,
        }
    }
}

impl std::str::FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "tutor" => Ok(Self::Tutor),
            other => Err(format!("unknown sender type: {other}")),
        }
    }
}

/// The single persistent thread between one client and one tutor.
/// Display fields are a snapshot taken at creation time and never refreshed;
/// a later rename does not propagate here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub client_id: Uuid,
    pub tutor_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub tutor_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable entry in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_type: SenderType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Inbox entry: a conversation plus its most recent message and the
/// coarse unread indicator (count of messages from the other party —
/// no read-state is persisted, so this never decreases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub unread_count: u32,
}

/// A tutor's directory profile. Only the existence check and display
/// name matter to the messaging core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorProfile {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}
