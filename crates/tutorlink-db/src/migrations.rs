use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tutors (
            id            TEXT PRIMARY KEY,
            display_name  TEXT NOT NULL,
            email         TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id            TEXT PRIMARY KEY,
            client_id     TEXT NOT NULL,
            tutor_id      TEXT NOT NULL REFERENCES tutors(id),
            client_name   TEXT NOT NULL,
            client_email  TEXT NOT NULL,
            tutor_name    TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(client_id, tutor_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_client
            ON conversations(client_id, updated_at);

        CREATE INDEX IF NOT EXISTS idx_conversations_tutor
            ON conversations(tutor_id, updated_at);

        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id),
            sender_type      TEXT NOT NULL CHECK (sender_type IN ('client', 'tutor')),
            content          TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
