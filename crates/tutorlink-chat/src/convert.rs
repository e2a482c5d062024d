//! Row-to-model conversion. Rows come back from SQLite as strings; the
//! parse here is lossy-with-a-warning rather than fallible, since the
//! schema's constraints make corrupt values unreachable in practice.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use tutorlink_db::models::{ConversationRow, ConversationSummaryRow, MessageRow};
use tutorlink_types::models::{Conversation, ConversationSummary, Message, SenderType};

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// Timestamps are stored as naive UTC ("YYYY-MM-DD HH:MM:SS.ffffff");
/// rows written by older schema defaults may lack the fraction.
pub(crate) fn parse_timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, raw, e);
            DateTime::default()
        })
}

fn parse_sender(raw: &str) -> SenderType {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}", e);
        SenderType::Client
    })
}

pub(crate) fn conversation(row: ConversationRow) -> Conversation {
    Conversation {
        id: parse_uuid(&row.id, "conversation id"),
        client_id: parse_uuid(&row.client_id, "client_id"),
        tutor_id: parse_uuid(&row.tutor_id, "tutor_id"),
        client_name: row.client_name,
        client_email: row.client_email,
        tutor_name: row.tutor_name,
        created_at: parse_timestamp(&row.created_at, "conversation created_at"),
        updated_at: parse_timestamp(&row.updated_at, "conversation updated_at"),
    }
}

pub(crate) fn message(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        conversation_id: parse_uuid(&row.conversation_id, "conversation_id"),
        sender_type: parse_sender(&row.sender_type),
        content: row.content,
        created_at: parse_timestamp(&row.created_at, "message created_at"),
    }
}

pub(crate) fn summary(row: ConversationSummaryRow) -> ConversationSummary {
    ConversationSummary {
        conversation: conversation(row.conversation),
        last_message: row.last_message.map(message),
        unread_count: row.unread_count,
    }
}
