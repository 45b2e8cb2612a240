use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::HistoryEntry;

impl Database {
    pub fn insert_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO message_history
                 (id, to_number, message_text, message_type, status,
                  external_message_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.to_number,
                entry.message_text,
                entry.message_type,
                entry.status,
                entry.external_message_id,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, to_number, message_text, message_type, status,
                    external_message_id, created_at
             FROM message_history
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_history)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let id_str: String = row.get(0)?;
    let created_str: String = row.get(6)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(HistoryEntry {
        id,
        to_number: row.get(1)?,
        message_text: row.get(2)?,
        message_type: row.get(3)?,
        status: row.get(4)?,
        external_message_id: row.get(5)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_list_history() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            to_number: "919876543210".into(),
            message_text: "your order shipped".into(),
            message_type: "reply".into(),
            status: "sent".into(),
            external_message_id: Some("wamid.abc123".into()),
            created_at: Utc::now(),
        };
        db.insert_history(&entry).unwrap();

        let recent = db.recent_history(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0], entry);
    }
}
