use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ApiSettings;

impl Database {
    /// Return the singleton settings row, or `None` when credentials have
    /// never been saved.  "Not configured yet" is a normal state, not an
    /// error.
    pub fn get_settings(&self) -> Result<Option<ApiSettings>> {
        let result = self.conn().query_row(
            "SELECT business_account_id, phone_number_id, access_token,
                    webhook_verify_token, updated_at
             FROM api_settings WHERE id = 1",
            [],
            row_to_settings,
        );

        match result {
            Ok(settings) => Ok(Some(settings)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Insert or replace the singleton settings row (`id = 1`).
    ///
    /// Exactly one row exists after a successful call; repeated saves
    /// update in place, they never append.
    pub fn upsert_settings(&self, settings: &ApiSettings) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO api_settings
                 (id, business_account_id, phone_number_id, access_token,
                  webhook_verify_token, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                settings.business_account_id,
                settings.phone_number_id,
                settings.access_token,
                settings.webhook_verify_token,
                settings.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace the webhook verify token on the existing settings row.
    ///
    /// Fails with [`StoreError::NotFound`] when no settings have been saved.
    pub fn update_verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<ApiSettings> {
        let affected = self.conn().execute(
            "UPDATE api_settings
             SET webhook_verify_token = ?1, updated_at = ?2
             WHERE id = 1",
            params![token, now.to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_settings()?.ok_or(StoreError::NotFound)
    }
}

fn row_to_settings(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiSettings> {
    let updated_str: String = row.get(4)?;
    let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ApiSettings {
        business_account_id: row.get(0)?,
        phone_number_id: row.get(1)?,
        access_token: row.get(2)?,
        webhook_verify_token: row.get(3)?,
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

    fn sample_settings() -> ApiSettings {
        ApiSettings {
            business_account_id: "1000001".into(),
            phone_number_id: "2000002".into(),
            access_token: "EAAtoken".into(),
            webhook_verify_token: "verify-abc".into(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_settings_is_none_not_error() {
        let (db, _dir) = test_db();
        assert!(db.get_settings().unwrap().is_none());
    }

    #[test]
    fn save_twice_keeps_single_row() {
        let (db, _dir) = test_db();

        let mut settings = sample_settings();
        db.upsert_settings(&settings).unwrap();

        settings.access_token = "EAAnew".into();
        db.upsert_settings(&settings).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM api_settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let loaded = db.get_settings().unwrap().unwrap();
        assert_eq!(loaded.access_token, "EAAnew");
    }

    #[test]
    fn regenerate_token_requires_existing_row() {
        let (db, _dir) = test_db();

        let err = db.update_verify_token("fresh", Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        db.upsert_settings(&sample_settings()).unwrap();
        let updated = db.update_verify_token("fresh", Utc::now()).unwrap();
        assert_eq!(updated.webhook_verify_token, "fresh");
    }
}
