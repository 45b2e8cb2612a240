//! # waboard-store
//!
//! SQLite-backed storage for the waboard messaging console.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: API credentials, the webhook-message inbox, the per-counterparty
//! conversation ledger, outbound message history, uploaded media, and daily
//! statistics.  Phone-number normalization lives here too, since the
//! digit-only form is the join key across tables.

pub mod conversations;
pub mod database;
pub mod history;
pub mod media;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod phone;
pub mod settings;
pub mod stats;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use stats::DailyStats;
