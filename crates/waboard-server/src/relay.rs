//! Media relay: resolve a provider media id and inline the binary as a
//! data URL.
//!
//! Cloud API media URLs are short-lived.  Expiry is a first-class,
//! non-fatal outcome here: a network failure, a "media not found/expired"
//! provider code, a missing download URL, and a failed binary download all
//! normalize to [`MediaFetch::Expired`].  Only credential problems surface
//! as errors.

use base64::Engine;
use serde::Serialize;
use tracing::debug;

use waboard_graph::GraphError;

use crate::api::AppState;
use crate::dispatch::graph_client;
use crate::error::ApiError;

const DEFAULT_MIME: &str = "image/jpeg";

/// Outcome of a media fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MediaFetch {
    #[serde(rename_all = "camelCase")]
    Inline { data_url: String, mime_type: String },
    Expired { expired: bool },
}

impl MediaFetch {
    fn expired() -> Self {
        MediaFetch::Expired { expired: true }
    }
}

pub async fn fetch_media(state: &AppState, media_id: &str) -> Result<MediaFetch, ApiError> {
    if media_id.trim().is_empty() {
        return Err(ApiError::Validation("mediaId must not be empty".into()));
    }

    let settings = { state.db()?.get_settings()? }.ok_or_else(|| {
        ApiError::Configuration("WhatsApp API credentials are not configured".into())
    })?;

    let client = graph_client(&settings, &state.config)?;

    let details = match client.get_media_details(media_id).await {
        Ok(details) => details,
        Err(e) => return soften(e, media_id, "metadata"),
    };

    let bytes = match client.download_media(&details).await {
        Ok(bytes) => bytes,
        Err(e) => return soften(e, media_id, "download"),
    };

    let mime_type = details
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME.to_string());

    Ok(MediaFetch::Inline {
        data_url: build_data_url(&bytes, &mime_type),
        mime_type,
    })
}

/// Classify a Graph failure during media retrieval.  Expired credentials
/// stay hard errors; everything else means "no longer retrievable".
fn soften(err: GraphError, media_id: &str, stage: &str) -> Result<MediaFetch, ApiError> {
    if err.is_token_expired() {
        return Err(ApiError::external(err));
    }
    debug!(media_id, stage, error = %err, "treating media as expired");
    Ok(MediaFetch::expired())
}

fn build_data_url(bytes: &[u8], mime_type: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppState;
    use crate::config::ServerConfig;

    #[test]
    fn data_url_assembly() {
        let url = build_data_url(b"hello", "image/png");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn expired_media_code_is_softened() {
        let err = GraphError::from_api_response(
            200,
            r#"{"error":{"message":"Unsupported get request","code":100,"error_subcode":33}}"#,
        );
        let out = soften(err, "MEDIA1", "metadata").unwrap();
        assert!(matches!(out, MediaFetch::Expired { expired: true }));
    }

    #[test]
    fn token_expiry_stays_a_hard_error() {
        let err = GraphError::from_api_response(
            401,
            r#"{"error":{"message":"expired","type":"OAuthException","code":190}}"#,
        );
        let out = soften(err, "MEDIA1", "metadata");
        assert!(matches!(
            out,
            Err(ApiError::ExternalApi {
                token_expired: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn missing_settings_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(
            ServerConfig::default(),
            Some(dir.path().join("test.db")),
        )
        .unwrap();

        let err = fetch_media(&state, "MEDIA1").await.unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }
}
