use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Per-day send/receive counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DailyStats {
    pub messages_sent: i64,
    pub messages_received: i64,
}

impl Database {
    /// Increment the sent counter for the day containing `now`.
    pub fn bump_sent(&self, now: DateTime<Utc>) -> Result<()> {
        self.bump(now, "messages_sent")
    }

    /// Increment the received counter for the day containing `now`.
    pub fn bump_received(&self, now: DateTime<Utc>) -> Result<()> {
        self.bump(now, "messages_received")
    }

    pub fn stats_for_day(&self, day: DateTime<Utc>) -> Result<DailyStats> {
        let result = self.conn().query_row(
            "SELECT messages_sent, messages_received FROM daily_statistics WHERE day = ?1",
            params![day_key(day)],
            |row| {
                Ok(DailyStats {
                    messages_sent: row.get(0)?,
                    messages_received: row.get(1)?,
                })
            },
        );
        match result {
            Ok(stats) => Ok(stats),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(DailyStats::default()),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    fn bump(&self, now: DateTime<Utc>, column: &str) -> Result<()> {
        // Column name comes from the two callers above, never from input.
        self.conn().execute(
            &format!(
                "INSERT INTO daily_statistics (day, {column}) VALUES (?1, 1)
                 ON CONFLICT(day) DO UPDATE SET {column} = {column} + 1"
            ),
            params![day_key(now)],
        )?;
        Ok(())
    }
}

fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let now = Utc::now();
        db.bump_sent(now).unwrap();
        db.bump_sent(now).unwrap();
        db.bump_received(now).unwrap();

        let stats = db.stats_for_day(now).unwrap();
        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.messages_received, 1);
    }

    #[test]
    fn missing_day_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        assert_eq!(db.stats_for_day(Utc::now()).unwrap(), DailyStats::default());
    }
}
