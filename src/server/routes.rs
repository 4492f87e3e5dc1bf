//! HTTP route handlers for the chat front end.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};

use crate::lifecycle::{ServiceStatus, StartOutcome};
use crate::llm::{ChatCall, ChatMessage, ProtocolVariant};
use crate::storage::{Transcript, TranscriptSummary};

use super::error::ApiError;
use super::state::AppState;

/// Chat page served at `/`.
const CHAT_PAGE: &str = include_str!("../../static/chat.html");

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/models", get(list_models))
        .route("/api/save_conversation", post(save_conversation))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/{filename}", get(load_conversation))
        .route("/api/llm_status", get(llm_status))
        .route("/api/start_llm", post(start_llm))
        .route("/api/shutdown", post(shutdown))
        .layer(body_limit)
        .with_state(state)
}

/// Render the chat interface.
async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "local-llm-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Chat request sent by the browser.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation history.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Runtime base URL.
    pub endpoint: Option<String>,
    /// Model name; required.
    #[serde(default)]
    pub model: String,
    /// Optional system prompt, prepended to the history.
    #[serde(default, rename = "systemPrompt")]
    pub system_prompt: String,
    /// Explicit protocol; inferred from the endpoint when absent or empty.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub protocol: Option<ProtocolVariant>,
}

/// Chat reply.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's response.
    pub response: String,
}

/// Relay a chat turn to the local runtime.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    if request.model.trim().is_empty() {
        return Err(ApiError::BadRequest("Model name is required".to_string()));
    }

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage::system(request.system_prompt));
    }
    messages.extend(request.messages);

    let endpoint = state.endpoint_or_default(request.endpoint);
    let response = state
        .llm
        .send_chat(&ChatCall {
            endpoint: &endpoint,
            protocol: state.protocol_or_default(request.protocol),
            model: &request.model,
            messages: &messages,
            temperature: request
                .temperature
                .unwrap_or(state.config.default_temperature),
        })
        .await?;

    Ok(Json(ChatResponse { response }))
}

/// Endpoint selection from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct EndpointQuery {
    /// Runtime base URL.
    pub endpoint: Option<String>,
    /// Explicit protocol; an empty value means none.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub protocol: Option<ProtocolVariant>,
}

/// Read an optional protocol, treating an empty or blank string like a missing one.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<ProtocolVariant>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Model listing response.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Model names as advertised by the runtime.
    pub models: Vec<String>,
}

/// List models available on the runtime.
async fn list_models(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EndpointQuery>, QueryRejection>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let Query(query) = query?;
    let endpoint = state.endpoint_or_default(query.endpoint);
    let models = state
        .llm
        .list_models(&endpoint, state.protocol_or_default(query.protocol))
        .await;
    Ok(Json(ModelsResponse { models }))
}

/// Save request.
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    /// Messages to persist.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Save response.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// File name inside the storage directory.
    pub filename: String,
    /// Full path on disk.
    pub path: String,
}

/// Persist a conversation.
async fn save_conversation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(request) = payload?;
    let saved = state.store.save(&request.messages).await?;
    Ok(Json(SaveResponse {
        success: true,
        filename: saved.filename,
        path: saved.path,
    }))
}

/// Conversation listing response.
#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    /// Saved conversations, newest first.
    pub conversations: Vec<TranscriptSummary>,
}

/// List saved conversations.
async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = state.store.list().await?;
    Ok(Json(ConversationsResponse { conversations }))
}

/// Load one saved conversation.
async fn load_conversation(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<Transcript>, ApiError> {
    Ok(Json(state.store.load(&filename).await?))
}

/// Report runtime install/run status.
async fn llm_status(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EndpointQuery>, QueryRejection>,
) -> Result<Json<ServiceStatus>, ApiError> {
    let Query(query) = query?;
    let endpoint = state.endpoint_or_default(query.endpoint);
    let status = state
        .probe
        .check_status(&endpoint, state.protocol_or_default(query.protocol))
        .await;
    Ok(Json(status))
}

/// Try to start the runtime.
async fn start_llm(State(state): State<Arc<AppState>>) -> Json<StartOutcome> {
    Json(state.probe.start_service().await)
}

/// Schedule a server shutdown and answer right away.
async fn shutdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("Server shutdown requested via web interface");
    state.shutdown.schedule(state.config.shutdown_delay).await;
    Json(serde_json::json!({ "message": "Server shutting down..." }))
}
