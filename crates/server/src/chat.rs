//! Chat routes.
//!
//! - `GET  /`                              chat page (transcript of `?session=`)
//! - `POST /api/v1/chat`                   run one turn: `{session_id?, message}`
//! - `GET  /api/v1/sessions/{id}/messages` transcript as JSON
//!
//! The page and the `reply` field carry assistant markdown rendered to HTML; the
//! transcript endpoint returns records as stored.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use storefront_agent::{Assistant, SessionId};
use storefront_core::{ApplicationError, ChatRecord, ChatRole, InterfaceError};
use tera::{Context, Tera};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::markdown;

const PAGE_TITLE: &str = "Shop Assistant";

#[derive(Clone)]
pub struct ChatState {
    assistant: Arc<Assistant>,
    templates: Arc<Tera>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub enhanced: bool,
}

/// A transcript entry as the page shows it.
#[derive(Debug, Serialize)]
struct PageMessage {
    role: ChatRole,
    html: String,
}

impl From<ChatRecord> for PageMessage {
    fn from(record: ChatRecord) -> Self {
        let html = match record.role {
            ChatRole::Assistant => markdown::render(&record.content),
            ChatRole::User => record.content,
        };
        Self { role: record.role, html }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub messages: Vec<ChatRecord>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn init_templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("chat.html", include_str!("../templates/chat.html"))?;
    Ok(Arc::new(tera))
}

pub fn router(assistant: Arc<Assistant>) -> Result<Router, tera::Error> {
    let state = ChatState { assistant, templates: init_templates()? };
    Ok(Router::new()
        .route("/", get(chat_page))
        .route("/api/v1/chat", post(post_chat))
        .route("/api/v1/sessions/{id}/messages", get(session_messages))
        .with_state(state))
}

async fn chat_page(
    State(state): State<ChatState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let session_id = query.session.as_deref().and_then(|raw| raw.parse::<SessionId>().ok());
    let records = match session_id {
        Some(id) => state.assistant.transcript(id).await.unwrap_or_default(),
        None => Vec::new(),
    };
    let messages: Vec<PageMessage> = records.into_iter().map(PageMessage::from).collect();

    let mut context = Context::new();
    context.insert("title", PAGE_TITLE);
    context.insert("session_id", &session_id.map(|id| id.to_string()).unwrap_or_default());
    context.insert("messages", &messages);

    state.templates.render("chat.html", &context).map(Html).map_err(|render_error| {
        error!(
            event_name = "chat.page_render_failed",
            error = %render_error,
            "chat page template failed to render"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
    })
}

async fn post_chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiFailure> {
    let correlation_id = Uuid::new_v4().to_string();
    let session_id = match request.session_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<SessionId>() {
            Ok(id) => Some(id),
            Err(_) => {
                let invalid =
                    ApplicationError::InvalidInput(format!("session_id `{raw}` is not a valid id"));
                return Err(api_error(invalid, correlation_id, None));
            }
        },
    };

    info!(
        event_name = "chat.turn_received",
        correlation_id = %correlation_id,
        session_id = ?session_id,
        "chat turn received"
    );

    match state.assistant.handle_turn(session_id, &request.message).await {
        Ok(turn) => Ok(Json(ChatResponse {
            session_id: turn.session_id.to_string(),
            enhanced: turn.enhanced(),
            reply: markdown::render(&turn.reply),
        })),
        Err(failure) => Err(api_error(failure.error, correlation_id, Some(failure.session_id))),
    }
}

async fn session_messages(
    State(state): State<ChatState>,
    Path(raw_id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiFailure> {
    let correlation_id = Uuid::new_v4().to_string();
    let Ok(session_id) = raw_id.parse::<SessionId>() else {
        let invalid = ApplicationError::InvalidInput(format!("`{raw_id}` is not a valid id"));
        return Err(api_error(invalid, correlation_id, None));
    };

    match state.assistant.transcript(session_id).await {
        Some(messages) => {
            Ok(Json(TranscriptResponse { session_id: session_id.to_string(), messages }))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: "Session not found.".to_string(),
                correlation_id,
                session_id: Some(session_id.to_string()),
            }),
        )),
    }
}

fn api_error(
    error: ApplicationError,
    correlation_id: String,
    session_id: Option<SessionId>,
) -> ApiFailure {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "chat.request_failed",
        correlation_id = interface.correlation_id(),
        status = status.as_u16(),
        error = %interface,
        "chat request failed"
    );

    (
        status,
        Json(ApiError {
            error: interface.user_message().to_string(),
            correlation_id: interface.correlation_id().to_string(),
            session_id: session_id.map(|id| id.to_string()),
        }),
    )
}
