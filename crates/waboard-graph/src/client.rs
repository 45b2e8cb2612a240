//! HTTP client for the WhatsApp Business Cloud API (Meta Graph API).
//!
//! Every call is a single attempt: a failed request is reported to the
//! caller immediately, with no retry loop or queueing.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::error::{GraphError, Result};

/// Connection parameters for one Graph API account.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// e.g. `https://graph.facebook.com`
    pub base_url: String,
    /// e.g. `v21.0`
    pub api_version: String,
    pub business_account_id: String,
    pub phone_number_id: String,
    pub access_token: String,
}

/// Low-level HTTP client for the Meta Graph API.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // -- URL helpers --------------------------------------------------

    /// Node URL: `{base}/{version}/{path}`.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            path
        )
    }

    /// Phone-number-scoped URL: `{base}/{version}/{phone_number_id}/{endpoint}`.
    pub fn phone_url(&self, endpoint: &str) -> String {
        self.url(&format!("{}/{}", self.config.phone_number_id, endpoint))
    }

    /// Business-account-scoped URL: `{base}/{version}/{waba_id}/{endpoint}`.
    pub fn waba_url(&self, endpoint: &str) -> String {
        self.url(&format!("{}/{}", self.config.business_account_id, endpoint))
    }

    // -- HTTP primitives ----------------------------------------------

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", self.config.access_token)) {
            headers.insert(AUTHORIZATION, v);
        }
        headers
    }

    /// GET a JSON node.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!(%url, "GET graph");
        let resp = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .send()
            .await?;
        Self::decode_json(resp).await
    }

    /// POST a JSON body.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        debug!(%url, "POST graph");
        let resp = self
            .client
            .post(url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await?;
        Self::decode_json(resp).await
    }

    /// Download raw bytes with auth (media binaries live on a CDN URL that
    /// still requires the bearer token).
    pub async fn download_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "GET graph bytes");
        let resp = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            Ok(resp.bytes().await?.to_vec())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(GraphError::from_api_response(status, &body))
        }
    }

    /// Connectivity probe: fetch the configured phone number node.  A
    /// successful response proves the token and phone number id are valid.
    pub async fn verify_connection(&self) -> Result<serde_json::Value> {
        let url = self.url(&self.config.phone_number_id);
        self.get_json(&url).await
    }

    async fn decode_json(resp: reqwest::Response) -> Result<serde_json::Value> {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            serde_json::from_str(&body)
                .map_err(|e| GraphError::InvalidResponse(format!("JSON parse error: {e}")))
        } else {
            Err(GraphError::from_api_response(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GraphConfig {
        GraphConfig {
            base_url: "https://graph.facebook.com".into(),
            api_version: "v21.0".into(),
            business_account_id: "5678".into(),
            phone_number_id: "1234".into(),
            access_token: "test_token".into(),
        }
    }

    #[test]
    fn url_builders() {
        let client = GraphClient::new(test_config()).unwrap();
        assert_eq!(
            client.phone_url("messages"),
            "https://graph.facebook.com/v21.0/1234/messages"
        );
        assert_eq!(
            client.waba_url("message_templates"),
            "https://graph.facebook.com/v21.0/5678/message_templates"
        );
        assert_eq!(
            client.url("MEDIA_ID_9"),
            "https://graph.facebook.com/v21.0/MEDIA_ID_9"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let mut config = test_config();
        config.base_url = "https://graph.facebook.com/".into();
        let client = GraphClient::new(config).unwrap();
        assert_eq!(
            client.phone_url("messages"),
            "https://graph.facebook.com/v21.0/1234/messages"
        );
    }
}
