//! Media metadata resolution and binary download.
//!
//! Cloud API media ids resolve to a short-lived CDN URL; both the metadata
//! lookup and the binary download can fail with "no longer retrievable"
//! outcomes that callers treat as expiry rather than hard errors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::GraphClient;
use crate::error::{GraphError, Result};

/// Metadata returned for a media id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetails {
    pub id: String,
    /// Short-lived download URL.
    pub url: String,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

impl GraphClient {
    /// Resolve a media id to its download URL and metadata.
    pub async fn get_media_details(&self, media_id: &str) -> Result<MediaDetails> {
        debug!(media_id, "resolving media details");
        let resp = self.get_json(&self.url(media_id)).await?;

        let url = resp["url"]
            .as_str()
            .ok_or_else(|| GraphError::InvalidResponse("no url in media response".into()))?
            .to_string();

        Ok(MediaDetails {
            id: resp["id"].as_str().unwrap_or(media_id).to_string(),
            url,
            mime_type: resp["mime_type"].as_str().map(|s| s.to_string()),
            file_size: resp["file_size"].as_u64(),
        })
    }

    /// Download the media binary from its resolved URL.
    pub async fn download_media(&self, details: &MediaDetails) -> Result<Vec<u8>> {
        self.download_bytes(&details.url).await
    }
}
