//! Message-template listing for the business account.

use serde::{Deserialize, Serialize};

use crate::client::GraphClient;
use crate::error::Result;

/// One approved/pending template as reported by the WABA node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub name: String,
    pub language: String,
    pub status: String,
    pub category: String,
}

impl GraphClient {
    /// List the templates registered on the business account.
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>> {
        let resp = self.get_json(&self.waba_url("message_templates")).await?;
        Ok(parse_templates(&resp))
    }
}

fn parse_templates(resp: &serde_json::Value) -> Vec<TemplateSummary> {
    resp["data"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|t| {
                    Some(TemplateSummary {
                        name: t["name"].as_str()?.to_string(),
                        language: t["language"].as_str().unwrap_or_default().to_string(),
                        status: t["status"].as_str().unwrap_or_default().to_string(),
                        category: t["category"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
