//! Scheduled maintenance sweep: delete uploaded-media rows older than the
//! retention window.  Triggered by an external scheduler hitting
//! `/cron/cleanup-expired-media` with the shared secret.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use tracing::info;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;

/// Media rows older than this many days are swept.
pub const RETENTION_DAYS: i64 = 30;

/// Validate the sweep bearer secret.
///
/// Constant-time comparison so the secret cannot be probed byte by byte.
pub fn verify_cron_secret(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ApiError> {
    let Some(ref expected) = config.cron_secret else {
        return Err(ApiError::Unauthorized(
            "sweep endpoint is disabled (no CRON_SECRET configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ApiError::Unauthorized("invalid sweep secret".into()));
    }

    Ok(())
}

/// Run the sweep to completion.  The deletion is a single statement: it
/// either removes every eligible row or fails as a whole with a storage
/// error, never partially.
pub fn run_sweep(state: &AppState) -> Result<usize, ApiError> {
    let cutoff = Utc::now() - Duration::days(RETENTION_DAYS);
    let deleted = state
        .db()?
        .delete_media_older_than(cutoff)
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    info!(deleted, %cutoff, "media sweep finished");
    Ok(deleted)
}
