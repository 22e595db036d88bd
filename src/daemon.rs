use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::client::SupportDesk;
use crate::config::Config;
use crate::domains::now_ms;
use crate::domains::user::User;
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::SupportStore;
use crate::services::auth::AuthService;
use crate::services::orchestrator::ConversationOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub store: Arc<dyn SupportStore>,
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    token: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationRequest {
    conversation_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    conversation_id: String,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EscalateRequest {
    conversation_id: String,
    email: String,
    notes: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/conversation/create", post(create_conversation))
        .route("/api/conversation/list", get(list_conversations))
        .route("/api/conversation/delete", delete(delete_conversation))
        .route("/api/message/send", post(send_message))
        .route("/api/message/list", get(list_messages))
        .route("/api/support/escalate", post(escalate))
        .with_state(state)
}

/// Liveness plus store reachability; stays 200 either way so probes read the
/// body rather than the status.
async fn health(State(state): State<AppState>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!(error = %err, "store ping failed");
            "disconnected"
        }
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp": now_ms(),
            "database": database,
        })),
    )
        .into_response()
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    match state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await
    {
        Ok((token, user)) => success_with_status(
            StatusCode::CREATED,
            json!({ "token": token, "user": public_user(&user) }),
        ),
        Err(err) => failure(err),
    }
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> Response {
    match state.auth.login(&payload.email, &payload.password).await {
        Ok((token, user)) => success(json!({ "token": token, "user": public_user(&user) })),
        Err(err) => failure(err),
    }
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Response {
    match state.auth.forgot_password(&payload.email).await {
        Ok(message) => success(json!({ "message": message })),
        Err(err) => failure(err),
    }
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Response {
    match state
        .auth
        .reset_password(&payload.token, &payload.password)
        .await
    {
        Ok(()) => success(json!({ "message": "Password updated." })),
        Err(err) => failure(err),
    }
}

async fn create_conversation(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.orchestrator.create_conversation(&user).await {
        Ok(conversation) => success(json!({
            "conversationId": conversation.id,
            "timestamp": conversation.created_at,
        })),
        Err(err) => failure(err),
    }
}

async fn list_conversations(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.orchestrator.list_conversations(&user).await {
        Ok(conversations) => {
            let data: Vec<_> = conversations
                .iter()
                .map(|conv| {
                    json!({
                        "id": conv.id,
                        "title": conv.title,
                        "preview": conv.preview,
                        "timestamp": conv.updated_at,
                        "status": conv.status.as_str(),
                        "escalated": conv.escalated(),
                    })
                })
                .collect();
            success(json!(data))
        }
        Err(err) => failure(err),
    }
}

async fn delete_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ConversationRequest>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state
        .orchestrator
        .delete_conversation(&payload.conversation_id, &user)
        .await
    {
        Ok(()) => success(json!({ "message": "Conversation deleted successfully" })),
        Err(err) => failure(err),
    }
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state
        .orchestrator
        .send_message(&payload.conversation_id, &user, &payload.message)
        .await
    {
        Ok(outcome) => success(json!({
            "messageId": outcome.message.id,
            "text": outcome.message.text,
            "timestamp": outcome.message.created_at,
            "role": outcome.message.role.as_str(),
            "generated": outcome.reply_generated,
            "suggestEscalation": outcome.escalation_suggested,
        })),
        Err(err) => failure(err),
    }
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConversationRequest>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state
        .orchestrator
        .list_messages(&query.conversation_id, &user)
        .await
    {
        Ok(messages) => {
            let data: Vec<_> = messages
                .iter()
                .map(|msg| {
                    json!({
                        "id": msg.id,
                        "conversationId": msg.conversation_id,
                        "text": msg.text,
                        "role": msg.role.as_str(),
                        "timestamp": msg.created_at,
                    })
                })
                .collect();
            success(json!(data))
        }
        Err(err) => failure(err),
    }
}

async fn escalate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EscalateRequest>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state
        .orchestrator
        .escalate(
            &payload.conversation_id,
            &user,
            &payload.email,
            payload.notes.as_deref(),
        )
        .await
    {
        Ok(outcome) => success(json!({
            "escalationId": outcome.escalation_id,
            "alertSent": outcome.alert_sent,
            "copySent": outcome.copy_sent,
            "message": "Your request has been escalated. You will receive an email shortly.",
        })),
        Err(err) => failure(err),
    }
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<User, Response> {
    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    state.auth.resolve_user(header).await.map_err(failure)
}

fn public_user(user: &User) -> serde_json::Value {
    json!({ "id": user.id, "name": user.name, "email": user.email })
}

fn success(data: serde_json::Value) -> Response {
    success_with_status(StatusCode::OK, data)
}

fn success_with_status(status: StatusCode, data: serde_json::Value) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

/// Taxonomy → status mapping. Internal failure detail never reaches the
/// client; the variants that are safe to show carry their own message.
fn failure(err: SupportDeskError) -> Response {
    let (status, message) = match &err {
        SupportDeskError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
        SupportDeskError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        SupportDeskError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
        SupportDeskError::Validation(message) => {
            (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
        }
        SupportDeskError::Config(_)
        | SupportDeskError::Upstream(_)
        | SupportDeskError::Storage(_) => {
            tracing::error!(error = %err, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };
    (
        status,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

pub async fn run(config: Config) -> Result<()> {
    run_with_shutdown(config, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let host = config
        .server
        .host
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config.server.port.unwrap_or(3000);

    let desk = SupportDesk::from_config(config).await?;
    let app = build_router(desk.into_state());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SupportDeskError::Config(e.to_string()))?;
    tracing::info!(%addr, "support-desk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SupportDeskError::Config(e.to_string()))?;
    Ok(())
}
