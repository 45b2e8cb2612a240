//! Outbound message dispatch and the bookkeeping that follows it.
//!
//! Ordering contract: the external send must complete successfully before
//! any local state is touched.  Local writes after a successful send are
//! best-effort -- they are logged and swallowed, never rolled back and
//! never surfaced to the caller, because the message already left.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use waboard_graph::{GraphClient, GraphConfig};
use waboard_store::{phone, ApiSettings, HistoryEntry};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;

/// Result of a successful dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub external_message_id: String,
}

/// Per-number result of a bulk send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    pub number: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum Outbound<'a> {
    Text(&'a str),
    Template { name: &'a str, language: &'a str },
}

/// Send a reply to an inbox counterparty.  On success, the most recent
/// unreplied message for the normalized number is marked replied.
pub async fn dispatch_reply(state: &AppState, to: &str, text: &str) -> Result<SendOutcome, ApiError> {
    require_nonempty(to, "toNumber")?;
    require_nonempty(text, "text")?;
    dispatch(state, to, text, Outbound::Text(text), "reply", true).await
}

/// Send a standalone text message (no reply bookkeeping).
pub async fn dispatch_text(state: &AppState, to: &str, text: &str) -> Result<SendOutcome, ApiError> {
    require_nonempty(to, "toNumber")?;
    require_nonempty(text, "text")?;
    dispatch(state, to, text, Outbound::Text(text), "text", false).await
}

/// Send an approved template by name and language code.
pub async fn dispatch_template(
    state: &AppState,
    to: &str,
    name: &str,
    language: &str,
) -> Result<SendOutcome, ApiError> {
    require_nonempty(to, "toNumber")?;
    require_nonempty(name, "templateName")?;
    let history_text = format!("[template] {name}");
    dispatch(
        state,
        to,
        &history_text,
        Outbound::Template { name, language },
        "template",
        false,
    )
    .await
}

/// Send the same text to many numbers, one external call each, collecting
/// per-number outcomes.  One recipient failing does not stop the rest.
pub async fn dispatch_bulk(
    state: &AppState,
    numbers: &[String],
    text: &str,
) -> Result<Vec<BulkItem>, ApiError> {
    require_nonempty(text, "text")?;
    if numbers.is_empty() {
        return Err(ApiError::Validation("numbers must not be empty".into()));
    }

    let mut items = Vec::with_capacity(numbers.len());
    for number in numbers {
        let normalized = phone::normalize(number);
        if normalized.is_empty() {
            items.push(BulkItem {
                number: number.clone(),
                success: false,
                external_message_id: None,
                error: Some("no digits in number".into()),
            });
            continue;
        }

        match dispatch_text(state, &normalized, text).await {
            Ok(outcome) => items.push(BulkItem {
                number: normalized,
                success: true,
                external_message_id: Some(outcome.external_message_id),
                error: None,
            }),
            Err(e) => items.push(BulkItem {
                number: normalized,
                success: false,
                external_message_id: None,
                error: Some(e.to_string()),
            }),
        }
    }
    Ok(items)
}

/// Build a Graph client for the stored credentials.
pub fn graph_client(settings: &ApiSettings, config: &ServerConfig) -> Result<GraphClient, ApiError> {
    GraphClient::new(GraphConfig {
        base_url: config.graph_base_url.clone(),
        api_version: config.graph_api_version.clone(),
        business_account_id: settings.business_account_id.clone(),
        phone_number_id: settings.phone_number_id.clone(),
        access_token: settings.access_token.clone(),
    })
    .map_err(ApiError::external)
}

async fn dispatch(
    state: &AppState,
    to: &str,
    history_text: &str,
    outbound: Outbound<'_>,
    message_type: &str,
    mark_reply: bool,
) -> Result<SendOutcome, ApiError> {
    // Load credentials up front; the lock must not be held across the send.
    let settings = { state.db()?.get_settings()? }.ok_or_else(|| {
        ApiError::Configuration("WhatsApp API credentials are not configured".into())
    })?;

    let client = graph_client(&settings, &state.config)?;

    let external_id = match outbound {
        Outbound::Text(body) => client.send_text(to, body).await,
        Outbound::Template { name, language } => client.send_template(to, name, language).await,
    }
    .map_err(ApiError::external)?;

    record_send(state, to, history_text, message_type, &external_id, mark_reply);

    Ok(SendOutcome {
        success: true,
        external_message_id: external_id,
    })
}

/// Post-send bookkeeping.  Every step here is best-effort.
fn record_send(
    state: &AppState,
    to: &str,
    text: &str,
    message_type: &str,
    external_id: &str,
    mark_reply: bool,
) {
    let now = Utc::now();

    let db = match state.db() {
        Ok(db) => db,
        Err(e) => {
            warn!(error = %e, "skipping send bookkeeping");
            return;
        }
    };

    let entry = HistoryEntry {
        id: Uuid::new_v4(),
        to_number: to.to_string(),
        message_text: text.to_string(),
        message_type: message_type.to_string(),
        status: "sent".to_string(),
        external_message_id: Some(external_id.to_string()),
        created_at: now,
    };
    if let Err(e) = db.insert_history(&entry) {
        warn!(error = %e, "failed to record message history");
    }

    if mark_reply {
        match db.mark_latest_replied(to, text, now) {
            Ok(true) => {}
            Ok(false) => debug!(to, "no unreplied message to mark"),
            Err(e) => warn!(error = %e, "failed to mark message replied"),
        }
    }

    if let Err(e) = db.record_activity(to, None, text, true, now) {
        warn!(error = %e, "failed to update conversation ledger");
    }

    if let Err(e) = db.bump_sent(now) {
        warn!(error = %e, "failed to bump daily statistics");
    }
}

fn require_nonempty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
