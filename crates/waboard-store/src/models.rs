//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the
//! HTTP layer as a JSON response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// API settings
// ---------------------------------------------------------------------------

/// WhatsApp Business API credentials. Exactly one logical row exists
/// (`id = 1`); created on first save, updated in place afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    pub business_account_id: String,
    pub phone_number_id: String,
    pub access_token: String,
    /// Shared secret echoed back during webhook subscription verification.
    pub webhook_verify_token: String,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Webhook messages
// ---------------------------------------------------------------------------

/// Direction of a message relative to the business number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "incoming" => Some(Direction::Incoming),
            "outgoing" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

/// Read state of an inbox message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<MessageStatus> {
        match s {
            "unread" => Some(MessageStatus::Unread),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

/// A message recorded from the inbound webhook or on reply send.
///
/// `replied`, `reply_text` and `reply_sent_at` are set exactly once, at
/// reply time; the unreplied -> replied transition is never reversed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookMessage {
    pub id: Uuid,
    pub from_number: String,
    pub to_number: String,
    pub message_text: String,
    pub direction: Direction,
    pub status: MessageStatus,
    pub replied: bool,
    pub reply_text: Option<String>,
    pub reply_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// Per-counterparty rollup, keyed by the normalized phone number.
///
/// `unread_count` resets to 0 on every outgoing message and increments by
/// one per incoming message. It is maintained independently from the
/// `status`/`replied` fields on `WebhookMessage` and the two may drift;
/// see DESIGN.md.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub phone_number: String,
    pub contact_name: Option<String>,
    pub last_message_text: String,
    pub last_message_time: DateTime<Utc>,
    pub last_message_is_outgoing: bool,
    pub unread_count: i64,
    pub has_incoming_messages: bool,
    pub has_replies: bool,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message history
// ---------------------------------------------------------------------------

/// Record of an outbound send attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub to_number: String,
    pub message_text: String,
    /// `reply`, `text` or `template`.
    pub message_type: String,
    pub status: String,
    /// Message id returned by the messaging provider, if any.
    pub external_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Uploaded media
// ---------------------------------------------------------------------------

/// Metadata for a media object uploaded to the messaging provider.
/// Rows are deleted by the maintenance sweep once older than the
/// retention window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedMedia {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
