//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `api_settings`, `webhook_messages`,
//! `message_history`, `uploaded_media`, and `daily_statistics`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- API settings (singleton row)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS api_settings (
    id                   INTEGER PRIMARY KEY CHECK (id = 1),
    business_account_id  TEXT NOT NULL,
    phone_number_id      TEXT NOT NULL,
    access_token         TEXT NOT NULL,
    webhook_verify_token TEXT NOT NULL,
    updated_at           TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Webhook messages (inbox)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS webhook_messages (
    id            TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    from_number   TEXT NOT NULL,
    to_number     TEXT NOT NULL,
    message_text  TEXT NOT NULL,
    direction     TEXT NOT NULL,                      -- 'incoming' | 'outgoing'
    status        TEXT NOT NULL DEFAULT 'unread',     -- 'unread' | 'read'
    replied       INTEGER NOT NULL DEFAULT 0,         -- boolean 0/1
    reply_text    TEXT,
    reply_sent_at TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_webhook_messages_status_ts
    ON webhook_messages(status, created_at DESC);

CREATE INDEX IF NOT EXISTS idx_webhook_messages_replied
    ON webhook_messages(replied);

-- ----------------------------------------------------------------
-- Message history (outbound send attempts)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS message_history (
    id                  TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    to_number           TEXT NOT NULL,
    message_text        TEXT NOT NULL,
    message_type        TEXT NOT NULL,                -- 'reply' | 'text' | 'template'
    status              TEXT NOT NULL,
    external_message_id TEXT,
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_message_history_ts
    ON message_history(created_at DESC);

-- ----------------------------------------------------------------
-- Uploaded media (swept after the retention window)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS uploaded_media (
    id          TEXT PRIMARY KEY NOT NULL,            -- UUID v4
    file_name   TEXT NOT NULL,
    mime_type   TEXT NOT NULL,
    file_size   INTEGER NOT NULL,
    uploaded_at TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_uploaded_media_created
    ON uploaded_media(created_at);

-- ----------------------------------------------------------------
-- Daily statistics
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS daily_statistics (
    day               TEXT PRIMARY KEY NOT NULL,      -- YYYY-MM-DD
    messages_sent     INTEGER NOT NULL DEFAULT 0,
    messages_received INTEGER NOT NULL DEFAULT 0
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
