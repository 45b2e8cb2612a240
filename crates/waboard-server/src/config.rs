//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Explicit path for the SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory (see `waboard_store::Database::new`).
    pub database_path: Option<PathBuf>,

    /// Shared secret for the scheduled maintenance sweep endpoint.
    /// Env: `CRON_SECRET`
    /// Default: empty (sweep endpoint disabled).
    pub cron_secret: Option<String>,

    /// Base URL of the Meta Graph API.
    /// Env: `GRAPH_BASE_URL`
    /// Default: `https://graph.facebook.com`
    pub graph_base_url: String,

    /// Graph API version segment.
    /// Env: `GRAPH_API_VERSION`
    /// Default: `v21.0`
    pub graph_api_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            cron_secret: None,
            graph_base_url: "https://graph.facebook.com".to_string(),
            graph_api_version: "v21.0".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(secret) = std::env::var("CRON_SECRET") {
            if !secret.is_empty() {
                config.cron_secret = Some(secret);
            }
        }

        if let Ok(url) = std::env::var("GRAPH_BASE_URL") {
            if !url.is_empty() {
                config.graph_base_url = url;
            }
        }

        if let Ok(version) = std::env::var("GRAPH_API_VERSION") {
            if !version.is_empty() {
                config.graph_api_version = version;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.graph_base_url, "https://graph.facebook.com");
        assert_eq!(config.graph_api_version, "v21.0");
        assert!(config.cron_secret.is_none());
    }
}
