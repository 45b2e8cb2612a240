use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use waboard_graph::TemplateSummary;
use waboard_store::{ApiSettings, Conversation, Database, MessageStatus, StoreError, WebhookMessage};

use crate::config::ServerConfig;
use crate::dispatch::{self, graph_client, BulkItem, SendOutcome};
use crate::error::ApiError;
use crate::ingest::{self, ImportRequest, ImportResponse};
use crate::relay::{self, MediaFetch};
use crate::sweep;
use crate::webhook;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the database (explicit path first, then the configured one,
    /// then the platform default) and wrap it for sharing across handlers.
    pub fn open(config: ServerConfig, db_path: Option<PathBuf>) -> Result<Self, StoreError> {
        let db = match db_path.or_else(|| config.database_path.clone()) {
            Some(path) => Database::open_at(&path)?,
            None => Database::new()?,
        };
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
        })
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Storage("database lock poisoned".into()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/settings", get(get_settings).post(save_settings))
        .route("/settings/regenerate-token", post(regenerate_token))
        .route("/settings/test", get(test_connection))
        .route("/messages", get(list_messages).patch(update_message))
        .route("/messages/reply", post(send_reply))
        .route("/messages/send", post(send_text))
        .route("/messages/bulk", post(send_bulk))
        .route("/messages/template", post(send_template))
        .route("/conversations", get(list_conversations))
        .route("/conversations/update", post(update_conversation))
        .route("/conversations/mark-read", post(mark_conversation_read))
        .route("/fetch-whatsapp-media", get(fetch_media))
        .route("/cron/cleanup-expired-media", get(cleanup_expired_media))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/templates", get(list_templates))
        .route("/contacts/import", post(import_contacts))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -- Health ---------------------------------------------------------

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// -- Settings -------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveSettingsRequest {
    business_account_id: Option<String>,
    phone_number_id: Option<String>,
    access_token: Option<String>,
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Option<ApiSettings>>, ApiError> {
    Ok(Json(state.db()?.get_settings()?))
}

/// Upsert the singleton credentials row.  Creation requires every field
/// and mints a fresh verify token; updates patch only the supplied fields.
async fn save_settings(
    State(state): State<AppState>,
    Json(req): Json<SaveSettingsRequest>,
) -> Result<Json<ApiSettings>, ApiError> {
    let db = state.db()?;
    let existing = db.get_settings()?;

    let merge = |supplied: Option<String>, current: Option<&str>, field: &str| {
        supplied
            .filter(|s| !s.trim().is_empty())
            .or_else(|| current.map(|s| s.to_string()))
            .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
    };

    let settings = ApiSettings {
        business_account_id: merge(
            req.business_account_id,
            existing.as_ref().map(|s| s.business_account_id.as_str()),
            "businessAccountId",
        )?,
        phone_number_id: merge(
            req.phone_number_id,
            existing.as_ref().map(|s| s.phone_number_id.as_str()),
            "phoneNumberId",
        )?,
        access_token: merge(
            req.access_token,
            existing.as_ref().map(|s| s.access_token.as_str()),
            "accessToken",
        )?,
        webhook_verify_token: existing
            .as_ref()
            .map(|s| s.webhook_verify_token.clone())
            .unwrap_or_else(generate_verify_token),
        updated_at: Utc::now(),
    };

    db.upsert_settings(&settings)?;
    info!("API settings saved");
    Ok(Json(settings))
}

async fn regenerate_token(State(state): State<AppState>) -> Result<Json<ApiSettings>, ApiError> {
    let db = state.db()?;
    let updated = db.update_verify_token(&generate_verify_token(), Utc::now())?;
    info!("webhook verify token regenerated");
    Ok(Json(updated))
}

async fn test_connection(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let settings = { state.db()?.get_settings()? }.ok_or_else(|| {
        ApiError::Configuration("WhatsApp API credentials are not configured".into())
    })?;

    let client = graph_client(&settings, &state.config)?;
    let node = client
        .verify_connection()
        .await
        .map_err(ApiError::external)?;

    Ok(Json(serde_json::json!({
        "connected": true,
        "displayPhoneNumber": node["display_phone_number"],
        "verifiedName": node["verified_name"],
    })))
}

/// Random printable token for webhook subscription verification.
/// Collisions are not checked; the token is a shared secret, not an id.
fn generate_verify_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

// -- Messages -------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest {
    to_number: String,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkRequest {
    numbers: Vec<String>,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRequest {
    to_number: String,
    template_name: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en_US".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    id: Uuid,
    status: String,
}

async fn send_reply(
    State(state): State<AppState>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<SendOutcome>, ApiError> {
    let outcome = dispatch::dispatch_reply(&state, &req.to_number, &req.text).await?;
    Ok(Json(outcome))
}

async fn send_text(
    State(state): State<AppState>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<SendOutcome>, ApiError> {
    let outcome = dispatch::dispatch_text(&state, &req.to_number, &req.text).await?;
    Ok(Json(outcome))
}

async fn send_bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> Result<Json<Vec<BulkItem>>, ApiError> {
    let items = dispatch::dispatch_bulk(&state, &req.numbers, &req.text).await?;
    Ok(Json(items))
}

async fn send_template(
    State(state): State<AppState>,
    Json(req): Json<TemplateRequest>,
) -> Result<Json<SendOutcome>, ApiError> {
    let outcome =
        dispatch::dispatch_template(&state, &req.to_number, &req.template_name, &req.language)
            .await?;
    Ok(Json(outcome))
}

async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<WebhookMessage>>, ApiError> {
    Ok(Json(state.db()?.list_messages()?))
}

async fn update_message(
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<WebhookMessage>, ApiError> {
    let status = MessageStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown status: {}", req.status)))?;
    let updated = state.db()?.update_message_status(req.id, status)?;
    Ok(Json(updated))
}

// -- Conversations --------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationUpdateRequest {
    phone_number: String,
    contact_name: Option<String>,
    message_text: String,
    is_outgoing: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadRequest {
    phone_number: String,
}

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.db()?.list_conversations()?))
}

async fn update_conversation(
    State(state): State<AppState>,
    Json(req): Json<ConversationUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("phoneNumber must not be empty".into()));
    }
    state.db()?.record_activity(
        &req.phone_number,
        req.contact_name.as_deref(),
        &req.message_text,
        req.is_outgoing,
        Utc::now(),
    )?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn mark_conversation_read(
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("phoneNumber must not be empty".into()));
    }
    let marked = state.db()?.mark_all_replied(&req.phone_number)?;
    Ok(Json(serde_json::json!({ "success": true, "marked": marked })))
}

// -- Media relay ----------------------------------------------------

#[derive(Deserialize)]
struct MediaQuery {
    #[serde(rename = "mediaId")]
    media_id: String,
}

async fn fetch_media(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<MediaFetch>, ApiError> {
    let fetched = relay::fetch_media(&state, &query.media_id).await?;
    Ok(Json(fetched))
}

// -- Maintenance sweep ----------------------------------------------

async fn cleanup_expired_media(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    sweep::verify_cron_secret(&headers, &state.config)?;
    let deleted = sweep::run_sweep(&state)?;
    Ok(Json(serde_json::json!({ "deletedCount": deleted })))
}

// -- Webhook intake -------------------------------------------------

async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = state
        .db()
        .ok()
        .and_then(|db| db.get_settings().ok().flatten())
        .map(|s| s.webhook_verify_token);

    if let Some(token) = token {
        if let Some(challenge) = webhook::subscription_challenge(&params, &token) {
            return challenge.into_response();
        }
    }
    (StatusCode::FORBIDDEN, "verification failed").into_response()
}

/// Always answers 200: the provider retries on any other status, and local
/// bookkeeping failures must not trigger redelivery storms.
async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let inbound = webhook::extract_inbound_texts(&payload);
    info!(count = inbound.len(), "webhook notification received");
    for message in &inbound {
        webhook::record_inbound(&state, message);
    }
    Json(serde_json::json!({ "received": true }))
}

// -- Templates & contact import -------------------------------------

async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateSummary>>, ApiError> {
    let settings = { state.db()?.get_settings()? }.ok_or_else(|| {
        ApiError::Configuration("WhatsApp API credentials are not configured".into())
    })?;

    let client = graph_client(&settings, &state.config)?;
    let templates = client.list_templates().await.map_err(ApiError::external)?;
    Ok(Json(templates))
}

async fn import_contacts(
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    Ok(Json(ingest::validate_import(&req)?))
}

// -- Serving --------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_token_is_printable_and_random() {
        let a = generate_verify_token();
        let b = generate_verify_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(
            ServerConfig::default(),
            Some(dir.path().join("test.db")),
        )
        .unwrap();
        (state, dir)
    }

    #[tokio::test]
    async fn save_settings_creates_then_updates_single_row() {
        let (state, _dir) = test_state();

        let created = save_settings(
            State(state.clone()),
            Json(SaveSettingsRequest {
                business_account_id: Some("5678".into()),
                phone_number_id: Some("1234".into()),
                access_token: Some("EAAfirst".into()),
            }),
        )
        .await
        .unwrap();
        let first_token = created.0.webhook_verify_token.clone();
        assert_eq!(first_token.len(), 32);

        // Partial update: only the access token changes, verify token stays.
        let updated = save_settings(
            State(state.clone()),
            Json(SaveSettingsRequest {
                business_account_id: None,
                phone_number_id: None,
                access_token: Some("EAAsecond".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.0.access_token, "EAAsecond");
        assert_eq!(updated.0.business_account_id, "5678");
        assert_eq!(updated.0.webhook_verify_token, first_token);

        let count: i64 = state
            .db()
            .unwrap()
            .conn()
            .query_row("SELECT COUNT(*) FROM api_settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn save_settings_requires_all_fields_on_create() {
        let (state, _dir) = test_state();

        let err = save_settings(
            State(state),
            Json(SaveSettingsRequest {
                business_account_id: Some("5678".into()),
                phone_number_id: None,
                access_token: Some("EAA".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn regenerate_token_without_settings_is_not_found() {
        let (state, _dir) = test_state();
        let err = regenerate_token(State(state)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
