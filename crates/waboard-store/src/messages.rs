use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Direction, MessageStatus, WebhookMessage};
use crate::phone;

const MESSAGE_COLUMNS: &str = "id, from_number, to_number, message_text, direction, \
                               status, replied, reply_text, reply_sent_at, created_at";

impl Database {
    pub fn insert_webhook_message(&self, message: &WebhookMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO webhook_messages
                 (id, from_number, to_number, message_text, direction,
                  status, replied, reply_text, reply_sent_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.id.to_string(),
                message.from_number,
                message.to_number,
                message.message_text,
                message.direction.as_str(),
                message.status.as_str(),
                message.replied as i64,
                message.reply_text,
                message.reply_sent_at.map(|t| t.to_rfc3339()),
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List the inbox with the canonical ordering: unread before read,
    /// then by most recent activity (`reply_sent_at` when present, else
    /// `created_at`), descending.  The final `id` key keeps ties in a
    /// consistent order across calls.
    pub fn list_messages(&self) -> Result<Vec<WebhookMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM webhook_messages
             ORDER BY CASE status WHEN 'unread' THEN 0 ELSE 1 END,
                      COALESCE(reply_sent_at, created_at) DESC,
                      id"
        ))?;

        let rows = stmt.query_map([], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn get_message(&self, id: Uuid) -> Result<WebhookMessage> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM webhook_messages WHERE id = ?1"),
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Set the read status of one message and return the updated record.
    ///
    /// Fails with [`StoreError::NotFound`] when the id matches no row.
    pub fn update_message_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> Result<WebhookMessage> {
        let affected = self.conn().execute(
            "UPDATE webhook_messages SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_message(id)
    }

    /// Mark the most recent unreplied message for the normalized
    /// counterparty as replied, recording the reply text and timestamp and
    /// flipping the status to read.
    ///
    /// The update is filtered to `replied = 0`, so repeating it is a no-op.
    /// Returns `false` (not an error) when no unreplied message matches.
    pub fn mark_latest_replied(
        &self,
        counterparty: &str,
        reply_text: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(id) = self.latest_unreplied_id(counterparty)? else {
            return Ok(false);
        };

        let affected = self.conn().execute(
            "UPDATE webhook_messages
             SET replied = 1, reply_text = ?1, reply_sent_at = ?2, status = 'read'
             WHERE id = ?3 AND replied = 0",
            params![reply_text, sent_at.to_rfc3339(), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Mark every unreplied message for the normalized counterparty as
    /// replied.  Deliberately leaves `conversations.unread_count` alone;
    /// the two counters are maintained independently.
    pub fn mark_all_replied(&self, counterparty: &str) -> Result<usize> {
        let key = phone::normalize(counterparty);
        let mut marked = 0;
        for (id, from_number, _) in self.unreplied_rows()? {
            if phone::normalize(&from_number) == key {
                marked += self.conn().execute(
                    "UPDATE webhook_messages SET replied = 1 WHERE id = ?1 AND replied = 0",
                    params![id.to_string()],
                )?;
            }
        }
        Ok(marked)
    }

    /// Most recent unreplied message id whose sender matches the
    /// normalized counterparty.  Stored numbers may carry formatting, so
    /// the digit-only comparison happens here rather than in SQL.
    fn latest_unreplied_id(&self, counterparty: &str) -> Result<Option<Uuid>> {
        let key = phone::normalize(counterparty);
        let rows = self.unreplied_rows()?;

        Ok(rows
            .into_iter()
            .filter(|(_, from, _)| phone::normalize(from) == key)
            .max_by(|a, b| a.2.cmp(&b.2))
            .map(|(id, _, _)| id))
    }

    fn unreplied_rows(&self) -> Result<Vec<(Uuid, String, DateTime<Utc>)>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, from_number, created_at FROM webhook_messages WHERE replied = 0",
        )?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let from: String = row.get(1)?;
            let ts: String = row.get(2)?;
            Ok((id, from, ts))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, from, ts) = row?;
            let id = Uuid::parse_str(&id)?;
            let ts = DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc);
            out.push((id, from, ts));
        }
        Ok(out)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<WebhookMessage> {
    let id_str: String = row.get(0)?;
    let direction_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let replied: i64 = row.get(6)?;
    let reply_sent_str: Option<String> = row.get(8)?;
    let created_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let direction = Direction::parse(&direction_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown direction: {direction_str}").into(),
        )
    })?;

    let status = MessageStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_str}").into(),
        )
    })?;

    let reply_sent_at = match reply_sent_str {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        8,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        ),
        None => None,
    };

    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(WebhookMessage {
        id,
        from_number: row.get(1)?,
        to_number: row.get(2)?,
        message_text: row.get(3)?,
        direction,
        status,
        replied: replied != 0,
        reply_text: row.get(7)?,
        reply_sent_at,
        created_at,
    })
}
