//! Outbound message sends through the Cloud API.

use serde_json::json;
use tracing::debug;

use crate::client::GraphClient;
use crate::error::{GraphError, Result};

impl GraphClient {
    /// Send a plain text message.  Returns the provider message id
    /// (`wamid...`).
    pub async fn send_text(&self, to: &str, body: &str) -> Result<String> {
        debug!(to, "sending text message");
        let payload = text_payload(to, body);
        let resp = self.post_json(&self.phone_url("messages"), &payload).await?;
        extract_message_id(&resp)
    }

    /// Send an approved template by name and language code.
    pub async fn send_template(&self, to: &str, name: &str, language: &str) -> Result<String> {
        debug!(to, template = name, "sending template message");
        let payload = template_payload(to, name, language);
        let resp = self.post_json(&self.phone_url("messages"), &payload).await?;
        extract_message_id(&resp)
    }
}

/// JSON envelope for a text send, per the Cloud API `/messages` endpoint.
pub(crate) fn text_payload(to: &str, body: &str) -> serde_json::Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "text",
        "text": { "preview_url": false, "body": body }
    })
}

pub(crate) fn template_payload(to: &str, name: &str, language: &str) -> serde_json::Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "template",
        "template": { "name": name, "language": { "code": language } }
    })
}

fn extract_message_id(resp: &serde_json::Value) -> Result<String> {
    resp["messages"][0]["id"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| GraphError::InvalidResponse("no message id in send response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_shape() {
        let p = text_payload("919876543210", "hello there");
        assert_eq!(p["messaging_product"], "whatsapp");
        assert_eq!(p["to"], "919876543210");
        assert_eq!(p["type"], "text");
        assert_eq!(p["text"]["body"], "hello there");
    }

    #[test]
    fn template_payload_shape() {
        let p = template_payload("15550100200", "order_update", "en_US");
        assert_eq!(p["type"], "template");
        assert_eq!(p["template"]["name"], "order_update");
        assert_eq!(p["template"]["language"]["code"], "en_US");
    }

    #[test]
    fn message_id_extraction() {
        let resp = serde_json::json!({
            "messaging_product": "whatsapp",
            "messages": [{ "id": "wamid.HBgL" }]
        });
        assert_eq!(extract_message_id(&resp).unwrap(), "wamid.HBgL");

        let empty = serde_json::json!({ "messages": [] });
        assert!(extract_message_id(&empty).is_err());
    }
}
