use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Conversation;
use crate::phone;

impl Database {
    /// Record inbound or outbound activity on the per-counterparty rollup.
    ///
    /// The ledger is runtime-optional: when the `conversations` table is not
    /// provisioned this returns `Ok(())` without touching anything, so its
    /// absence never blocks message send or receive.
    ///
    /// Outgoing activity sets `has_replies` and resets `unread_count` to 0;
    /// incoming activity sets `has_incoming_messages` and increments
    /// `unread_count` by one.  The read-modify-write is not transactional;
    /// racing updates may lose an increment, accepted by design.
    pub fn record_activity(
        &self,
        counterparty: &str,
        contact_name: Option<&str>,
        text: &str,
        is_outgoing: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.has_table("conversations")? {
            tracing::debug!("conversations table not provisioned, skipping ledger update");
            return Ok(());
        }

        let key = phone::normalize(counterparty);

        match self.get_conversation(&key)? {
            Some(existing) => {
                let unread = if is_outgoing {
                    0
                } else {
                    existing.unread_count + 1
                };
                self.conn().execute(
                    "UPDATE conversations
                     SET contact_name = COALESCE(?1, contact_name),
                         last_message_text = ?2,
                         last_message_time = ?3,
                         last_message_is_outgoing = ?4,
                         unread_count = ?5,
                         has_incoming_messages = has_incoming_messages OR ?6,
                         has_replies = has_replies OR ?7,
                         updated_at = ?8
                     WHERE phone_number = ?9",
                    params![
                        contact_name,
                        text,
                        now.to_rfc3339(),
                        is_outgoing as i64,
                        unread,
                        !is_outgoing as i64,
                        is_outgoing as i64,
                        now.to_rfc3339(),
                        key,
                    ],
                )?;
            }
            None => {
                self.conn().execute(
                    "INSERT INTO conversations
                         (phone_number, contact_name, last_message_text, last_message_time,
                          last_message_is_outgoing, unread_count, has_incoming_messages,
                          has_replies, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        key,
                        contact_name,
                        text,
                        now.to_rfc3339(),
                        is_outgoing as i64,
                        if is_outgoing { 0 } else { 1 },
                        !is_outgoing as i64,
                        is_outgoing as i64,
                        now.to_rfc3339(),
                    ],
                )?;
            }
        }

        Ok(())
    }

    /// Look up one conversation by (any form of) phone number.
    pub fn get_conversation(&self, counterparty: &str) -> Result<Option<Conversation>> {
        if !self.has_table("conversations")? {
            return Ok(None);
        }

        let key = phone::normalize(counterparty);
        let result = self.conn().query_row(
            "SELECT phone_number, contact_name, last_message_text, last_message_time,
                    last_message_is_outgoing, unread_count, has_incoming_messages,
                    has_replies, updated_at
             FROM conversations WHERE phone_number = ?1",
            params![key],
            row_to_conversation,
        );

        match result {
            Ok(conv) => Ok(Some(conv)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// List all conversations, most recently active first.  Returns an
    /// empty list when the table is not provisioned.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        if !self.has_table("conversations")? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn().prepare(
            "SELECT phone_number, contact_name, last_message_text, last_message_time,
                    last_message_is_outgoing, unread_count, has_incoming_messages,
                    has_replies, updated_at
             FROM conversations ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], row_to_conversation)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let last_time_str: String = row.get(3)?;
    let last_is_outgoing: i64 = row.get(4)?;
    let has_incoming: i64 = row.get(6)?;
    let has_replies: i64 = row.get(7)?;
    let updated_str: String = row.get(8)?;

    let last_message_time = DateTime::parse_from_rfc3339(&last_time_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Conversation {
        phone_number: row.get(0)?,
        contact_name: row.get(1)?,
        last_message_text: row.get(2)?,
        last_message_time,
        last_message_is_outgoing: last_is_outgoing != 0,
        unread_count: row.get(5)?,
        has_incoming_messages: has_incoming != 0,
        has_replies: has_replies != 0,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn incoming_increments_unread_count() {
        let (db, _dir) = test_db();

        db.record_activity("+91 9876543210", Some("Asha"), "hi", false, Utc::now())
            .unwrap();
        db.record_activity("919876543210", None, "there?", false, Utc::now())
            .unwrap();

        let conv = db.get_conversation("9876543210-ish +91").unwrap().unwrap();
        assert_eq!(conv.unread_count, 2);
        assert!(conv.has_incoming_messages);
        assert!(!conv.has_replies);
        assert_eq!(conv.contact_name.as_deref(), Some("Asha"));
        assert_eq!(conv.last_message_text, "there?");
    }

    #[test]
    fn outgoing_resets_unread_count() {
        let (db, _dir) = test_db();

        db.record_activity("919876543210", None, "a", false, Utc::now())
            .unwrap();
        db.record_activity("919876543210", None, "b", false, Utc::now())
            .unwrap();
        db.record_activity("919876543210", None, "our reply", true, Utc::now())
            .unwrap();

        let conv = db.get_conversation("919876543210").unwrap().unwrap();
        assert_eq!(conv.unread_count, 0);
        assert!(conv.has_replies);
        assert!(conv.has_incoming_messages);
        assert!(conv.last_message_is_outgoing);
    }

    #[test]
    fn first_outgoing_seeds_zero_unread() {
        let (db, _dir) = test_db();

        db.record_activity("15550100200", None, "hello", true, Utc::now())
            .unwrap();

        let conv = db.get_conversation("15550100200").unwrap().unwrap();
        assert_eq!(conv.unread_count, 0);
        assert!(conv.has_replies);
        assert!(!conv.has_incoming_messages);
    }

    #[test]
    fn missing_table_degrades_to_noop() {
        let (db, _dir) = test_db();
        db.conn().execute("DROP TABLE conversations", []).unwrap();

        db.record_activity("15550100200", None, "hello", false, Utc::now())
            .expect("must not error without the table");
        assert!(db.get_conversation("15550100200").unwrap().is_none());
        assert!(db.list_conversations().unwrap().is_empty());
    }

    #[test]
    fn key_is_digit_only() {
        let (db, _dir) = test_db();
        db.record_activity("+1 (555) 010-0200", None, "x", false, Utc::now())
            .unwrap();

        let conv = db.get_conversation("15550100200").unwrap().unwrap();
        assert_eq!(conv.phone_number, "15550100200");
    }
}
