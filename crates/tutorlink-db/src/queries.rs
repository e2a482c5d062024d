use crate::Database;
use crate::models::{ConversationRow, ConversationSummaryRow, MessageRow, TutorRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

/// Timestamps are written by the application rather than relying on the
/// column default: `datetime('now')` only has second resolution, which is
/// too coarse to keep inbox ordering stable under rapid appends.
fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

impl Database {
    // -- Tutors --

    pub fn upsert_tutor(&self, id: &str, display_name: &str, email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tutors (id, display_name, email) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET display_name = ?2, email = ?3",
                (id, display_name, email),
            )?;
            Ok(())
        })
    }

    pub fn get_tutor(&self, id: &str) -> Result<Option<TutorRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, display_name, email FROM tutors WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(TutorRow {
                            id: row.get(0)?,
                            display_name: row.get(1)?,
                            email: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Conversations --

    /// Find-or-create the single conversation for a (client, tutor) pair.
    ///
    /// The UNIQUE(client_id, tutor_id) constraint is the correctness
    /// mechanism: concurrent resolvers both attempt the insert, exactly one
    /// wins, and both read back the surviving row. Never check-then-insert.
    pub fn resolve_conversation(
        &self,
        id: &str,
        client_id: &str,
        tutor_id: &str,
        client_name: &str,
        client_email: &str,
        tutor_name: &str,
    ) -> Result<ConversationRow> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO conversations
                     (id, client_id, tutor_id, client_name, client_email, tutor_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(client_id, tutor_id) DO NOTHING",
                rusqlite::params![id, client_id, tutor_id, client_name, client_email, tutor_name, now],
            )?;

            query_conversation_by_pair(conn, client_id, tutor_id)?
                .ok_or_else(|| anyhow!("conversation vanished after upsert: {}/{}", client_id, tutor_id))
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{CONVERSATION_COLUMNS} WHERE id = ?1"))?;
            let row = stmt.query_row([id], conversation_from_row).optional()?;
            Ok(row)
        })
    }

    /// Bump `updated_at` so the inbox sorts this conversation first.
    /// Callers treat a failure here as non-fatal: the message write stands.
    pub fn touch_conversation(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
                (id, now_timestamp()),
            )?;
            Ok(())
        })
    }

    pub fn list_conversations_for_client(&self, client_id: &str) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| query_summaries(conn, client_id, "client_id", "tutor"))
    }

    pub fn list_conversations_for_tutor(&self, tutor_id: &str) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| query_summaries(conn, tutor_id, "tutor_id", "client"))
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_type: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_type, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, conversation_id, sender_type, content, now],
            )?;
            Ok(MessageRow {
                id: id.to_string(),
                conversation_id: conversation_id.to_string(),
                sender_type: sender_type.to_string(),
                content: content.to_string(),
                created_at: now,
            })
        })
    }

    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_type, content, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([conversation_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

const CONVERSATION_COLUMNS: &str =
    "SELECT id, client_id, tutor_id, client_name, client_email, tutor_name, created_at, updated_at
     FROM conversations";

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        tutor_id: row.get(2)?,
        client_name: row.get(3)?,
        client_email: row.get(4)?,
        tutor_name: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_type: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_conversation_by_pair(
    conn: &Connection,
    client_id: &str,
    tutor_id: &str,
) -> Result<Option<ConversationRow>> {
    let mut stmt =
        conn.prepare(&format!("{CONVERSATION_COLUMNS} WHERE client_id = ?1 AND tutor_id = ?2"))?;
    let row = stmt
        .query_row([client_id, tutor_id], conversation_from_row)
        .optional()?;
    Ok(row)
}

/// Inbox query: conversations for one side of the relationship, newest
/// first, each joined to its latest message in a single statement
/// (eliminates N+1). `unread` counts messages from the other party —
/// no read-state is persisted, so this is a coarse indicator only.
fn query_summaries(
    conn: &Connection,
    user_id: &str,
    owner_column: &str,
    other_sender: &str,
) -> Result<Vec<ConversationSummaryRow>> {
    let sql = format!(
        "SELECT c.id, c.client_id, c.tutor_id, c.client_name, c.client_email, c.tutor_name,
                c.created_at, c.updated_at,
                lm.id, lm.sender_type, lm.content, lm.created_at,
                (SELECT COUNT(*) FROM messages
                 WHERE conversation_id = c.id AND sender_type = ?2) AS unread
         FROM conversations c
         LEFT JOIN messages lm ON lm.id = (
             SELECT id FROM messages
             WHERE conversation_id = c.id
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1)
         WHERE c.{owner_column} = ?1
         ORDER BY c.updated_at DESC, c.rowid DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id, other_sender], |row| {
            let conversation = conversation_from_row(row)?;

            let last_id: Option<String> = row.get(8)?;
            let last_message = match last_id {
                Some(id) => Some(MessageRow {
                    id,
                    conversation_id: conversation.id.clone(),
                    sender_type: row.get(9)?,
                    content: row.get(10)?,
                    created_at: row.get(11)?,
                }),
                None => None,
            };

            Ok(ConversationSummaryRow {
                conversation,
                last_message,
                unread_count: row.get(12)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
