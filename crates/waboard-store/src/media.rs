use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::UploadedMedia;

impl Database {
    pub fn insert_uploaded_media(&self, media: &UploadedMedia) -> Result<()> {
        self.conn().execute(
            "INSERT INTO uploaded_media
                 (id, file_name, mime_type, file_size, uploaded_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                media.id.to_string(),
                media.file_name,
                media.mime_type,
                media.file_size,
                media.uploaded_at.to_rfc3339(),
                media.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete every media row created before the cutoff.  Runs as a single
    /// statement, so the sweep either deletes everything eligible or
    /// nothing.  Returns the number of rows removed.
    pub fn delete_media_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM uploaded_media WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn media_created(created_at: DateTime<Utc>) -> UploadedMedia {
        UploadedMedia {
            id: Uuid::new_v4(),
            file_name: "promo.jpg".into(),
            mime_type: "image/jpeg".into(),
            file_size: 2048,
            uploaded_at: created_at,
            created_at,
        }
    }

    #[test]
    fn sweep_deletes_only_rows_past_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let now = Utc::now();
        let old = media_created(now - Duration::days(31));
        let fresh = media_created(now - Duration::days(29));
        db.insert_uploaded_media(&old).unwrap();
        db.insert_uploaded_media(&fresh).unwrap();

        let deleted = db.delete_media_older_than(now - Duration::days(30)).unwrap();
        assert_eq!(deleted, 1);

        let remaining: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM uploaded_media", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
