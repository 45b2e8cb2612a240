//! # waboard-graph
//!
//! Client for the WhatsApp Business Cloud API (Meta Graph API): text and
//! template sends, template listing, media metadata/binary resolution, and
//! a connectivity probe.
//!
//! Design constraint: one external call per operation.  There is no retry
//! loop, batching, or queueing -- a failed call is reported immediately and
//! the caller decides what to do.

pub mod client;
pub mod media;
pub mod messages;
pub mod templates;

mod error;

pub use client::{GraphClient, GraphConfig};
pub use error::GraphError;
pub use media::MediaDetails;
pub use templates::TemplateSummary;
