use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{delete, get, post, routes, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::Config;

use crate::sessions::{Conversation, SessionRegistry, TurnOutcome, VisibleMessage};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub conversation: Arc<Conversation>,
    pub sessions: SessionRegistry,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    active_sessions: usize,
}

#[derive(Serialize)]
struct SessionView {
    session_id: Uuid,
    messages: Vec<VisibleMessage>,
    /// Shown inline to the user, e.g. an invalid article number
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    /// Tool call that could not run; for API clients, the page ignores it
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_error: Option<String>,
}

#[derive(Deserialize)]
struct UserMessage {
    content: String,
}

#[get("/")]
async fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        active_sessions: state.sessions.len().await,
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// Create a session; the assistant's greeting is part of the response
#[post("/api/v1/sessions")]
async fn create_session(state: &State<AppState>) -> Result<Json<SessionView>, Status> {
    let session = state.conversation.start_session().await.map_err(|e| {
        tracing::error!("failed to start session: {:#}", e);
        Status::BadGateway
    })?;

    let messages = session.visible_messages();
    let session_id = state.sessions.insert(session).await;
    tracing::info!(%session_id, "session created");

    Ok(Json(SessionView {
        session_id,
        messages,
        warning: None,
        tool_error: None,
    }))
}

#[get("/api/v1/sessions/<session_id>")]
async fn get_session(state: &State<AppState>, session_id: Uuid) -> Result<Json<SessionView>, Status> {
    let handle = state.sessions.get(&session_id).await.ok_or(Status::NotFound)?;
    let session = handle.lock().await;

    Ok(Json(SessionView {
        session_id,
        messages: session.visible_messages(),
        warning: None,
        tool_error: None,
    }))
}

#[post("/api/v1/sessions/<session_id>/messages", data = "<body>")]
async fn post_message(
    state: &State<AppState>,
    session_id: Uuid,
    body: Json<UserMessage>,
) -> Result<Json<SessionView>, Status> {
    let handle = state.sessions.get(&session_id).await.ok_or(Status::NotFound)?;
    let mut session = handle.lock().await;

    let mut view = SessionView {
        session_id,
        messages: Vec::new(),
        warning: None,
        tool_error: None,
    };

    let content = body.content.trim();
    if !content.is_empty() {
        let outcome = state
            .conversation
            .handle_user_input(&mut session, content)
            .await
            .map_err(|e| {
                tracing::error!(%session_id, "turn failed: {:#}", e);
                Status::BadGateway
            })?;

        match outcome {
            TurnOutcome::Replied => {}
            TurnOutcome::SelectionRejected { warning } => view.warning = Some(warning),
            TurnOutcome::ToolAborted(e) => view.tool_error = Some(e.to_string()),
        }
    }

    view.messages = session.visible_messages();
    Ok(Json(view))
}

#[delete("/api/v1/sessions/<session_id>")]
async fn end_session(state: &State<AppState>, session_id: Uuid) -> Status {
    if state.sessions.remove(&session_id).await {
        tracing::info!(%session_id, "session ended");
        Status::NoContent
    } else {
        Status::NotFound
    }
}

/// Build the Rocket instance. Split out from `launch_rocket` so tests can drive it locally.
pub fn build_rocket(config: &Config, conversation: Arc<Conversation>) -> rocket::Rocket<rocket::Build> {
    let state = AppState {
        started_at: Utc::now(),
        conversation,
        sessions: SessionRegistry::with_idle_timeout(Duration::from_secs(
            config.server.session_idle_minutes.saturating_mul(60),
        )),
    };

    let fig = rocket::Config::figment()
        .merge(("address", config.server.bind.clone()))
        .merge(("port", config.server.port));

    rocket::custom(fig).manage(state).mount(
        "/",
        routes![
            index,
            health,
            status,
            create_session,
            get_session,
            post_message,
            end_session,
        ],
    )
}

/// Run the HTTP server until Rocket shuts down (SIGINT/SIGTERM etc.)
pub async fn launch_rocket(config: &Config, conversation: Arc<Conversation>) -> Result<()> {
    tracing::info!(
        bind = %config.server.bind,
        port = config.server.port,
        "Starting Rocket HTTP server"
    );

    build_rocket(config, conversation)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
