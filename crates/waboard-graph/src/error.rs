use thiserror::Error;

/// Errors produced by Graph API calls.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the Graph API, with the provider's own
    /// error envelope decoded.  The HTTP status is carried verbatim.
    #[error("Graph API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        error_type: String,
        code: u64,
        subcode: u64,
    },

    /// 2xx response whose body did not have the expected shape.
    #[error("Unexpected Graph API response: {0}")]
    InvalidResponse(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    /// Decode Meta's error envelope:
    /// `{"error":{"message":"...","type":"...","code":N,"error_subcode":N,"fbtrace_id":"..."}}`.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
        let err = &parsed["error"];
        GraphError::Api {
            status,
            message: err["message"]
                .as_str()
                .unwrap_or("Unknown Graph API error")
                .to_string(),
            error_type: err["type"].as_str().unwrap_or_default().to_string(),
            code: err["code"].as_u64().unwrap_or(0),
            subcode: err["error_subcode"].as_u64().unwrap_or(0),
        }
    }

    /// Error code 190 / type `OAuthException` signals an expired or revoked
    /// credential.  Callers surface this distinctly from other failures.
    pub fn is_token_expired(&self) -> bool {
        match self {
            GraphError::Api {
                code, error_type, ..
            } => *code == 190 || error_type == "OAuthException",
            _ => false,
        }
    }

    /// Whether this failure means a media object is no longer retrievable.
    ///
    /// Meta reports expired media as code 100 / subcode 33 (sometimes with
    /// HTTP 200 on the metadata call); a plain 404 means the same thing.
    pub fn is_media_unavailable(&self) -> bool {
        match self {
            GraphError::Api {
                status,
                code,
                subcode,
                ..
            } => (*code == 100 && *subcode == 33) || *status == 404,
            _ => false,
        }
    }

    /// HTTP status of the provider response, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GraphError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_meta_error_envelope() {
        let body = r#"{"error":{"message":"Invalid OAuth access token","type":"OAuthException","code":190,"fbtrace_id":"abc"}}"#;
        let err = GraphError::from_api_response(401, body);
        match &err {
            GraphError::Api {
                status,
                message,
                code,
                ..
            } => {
                assert_eq!(*status, 401);
                assert_eq!(*code, 190);
                assert!(message.contains("Invalid OAuth"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.is_token_expired());
    }

    #[test]
    fn code_190_is_token_expired() {
        let body = r#"{"error":{"message":"Session expired","type":"GraphMethodException","code":190}}"#;
        assert!(GraphError::from_api_response(400, body).is_token_expired());
    }

    #[test]
    fn media_expiry_is_code_100_subcode_33_regardless_of_status() {
        let body = r#"{"error":{"message":"Unsupported get request","type":"GraphMethodException","code":100,"error_subcode":33}}"#;
        for status in [200u16, 400, 500] {
            let err = GraphError::from_api_response(status, body);
            assert!(err.is_media_unavailable(), "status {status}");
            assert!(!err.is_token_expired());
        }
    }

    #[test]
    fn plain_404_is_media_unavailable() {
        let err = GraphError::from_api_response(404, "not json at all");
        assert!(err.is_media_unavailable());
    }

    #[test]
    fn unparseable_body_keeps_status() {
        let err = GraphError::from_api_response(500, "<html>oops</html>");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_token_expired());
    }
}
