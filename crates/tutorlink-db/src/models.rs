/// Database row types — these map directly to SQLite rows.
/// Distinct from tutorlink-types API models to keep the DB layer independent.

pub struct TutorRow {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

pub struct ConversationRow {
    pub id: String,
    pub client_id: String,
    pub tutor_id: String,
    pub client_name: String,
    pub client_email: String,
    pub tutor_name: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: String,
    pub content: String,
    pub created_at: String,
}

/// One inbox entry as read from the store: the conversation, its latest
/// message if any, and the count of messages from the other party.
pub struct ConversationSummaryRow {
    pub conversation: ConversationRow,
    pub last_message: Option<MessageRow>,
    pub unread_count: u32,
}
