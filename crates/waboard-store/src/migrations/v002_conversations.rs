//! v002 -- Conversation rollup table.
//!
//! The ledger is runtime-optional: deployments that never ran this
//! migration (or that dropped the table) still send and receive messages.
//! Callers probe `Database::has_table("conversations")` before touching it.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    phone_number             TEXT PRIMARY KEY NOT NULL,  -- normalized (digits only)
    contact_name             TEXT,
    last_message_text        TEXT NOT NULL,
    last_message_time        TEXT NOT NULL,
    last_message_is_outgoing INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    unread_count             INTEGER NOT NULL DEFAULT 0,
    has_incoming_messages    INTEGER NOT NULL DEFAULT 0,
    has_replies              INTEGER NOT NULL DEFAULT 0,
    updated_at               TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated
    ON conversations(updated_at DESC);
"#;

/// Apply the conversations migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
