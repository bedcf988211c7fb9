//! HTTP surface
//!
//! Routing and request/response plumbing around the stream processor:
//! one SSE chat endpoint plus small CRUD handlers for the live history
//! and the archived conversations.

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use anyhow::Result;

use crate::archive::{ArchiveFilter, ConversationRecord, ConversationStore};
use crate::config::RelayConfig;
use crate::conversation::ConversationHistory;
use crate::provider::LLMProvider;
use crate::stream::{SseForwarder, StreamEvent, StreamSession};

struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Relay Server Error: {}", self.0),
        );
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn LLMProvider>,
    pub history: Arc<Mutex<ConversationHistory>>,
    pub store: Arc<dyn ConversationStore>,
    pub filter: Arc<ArchiveFilter>,
    pub config: Arc<RelayConfig>,
    pub conversation_id: Arc<Mutex<String>>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        store: Arc<dyn ConversationStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            provider,
            history: Arc::new(Mutex::new(ConversationHistory::new())),
            store,
            filter: Arc::new(ArchiveFilter::new(config.archive.clone())),
            config: Arc::new(config),
            conversation_id: Arc::new(Mutex::new(uuid::Uuid::new_v4().to_string())),
        }
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
    #[serde(default)]
    stream: bool,
}

#[derive(Deserialize, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Serialize)]
struct Choice {
    message: Message,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/history", get(get_history))
        .route("/v1/history/clear", post(clear_history))
        .route("/v1/conversations", get(list_conversations))
        .route("/v1/conversations/{id}", get(get_conversation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState) -> Result<()> {
    let addr = state.config.listen_addr.clone();
    let app = router(state);

    info!("relay listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let live_messages = state.history.lock().await.len();
    Json(serde_json::json!({
        "service": "chat_relay",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.model,
        "live_messages": live_messages,
    }))
}

async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    let history = state.history.lock().await;
    Json(history.snapshot())
}

async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    state.history.lock().await.clear();
    *state.conversation_id.lock().await = uuid::Uuid::new_v4().to_string();
    (StatusCode::OK, Json(serde_json::json!({ "status": "cleared" })))
}

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
    let ids = state.store.list().await?;
    Ok(Json(serde_json::json!({ "conversations": ids })))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    match state.store.load(&id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "conversation not found" })),
        )
            .into_response()),
    }
}

/// Apply one emitted event to the live history.
fn record_event(history: &mut ConversationHistory, event: &StreamEvent) {
    match event {
        StreamEvent::Text { content } => history.add_assistant(content.clone()),
        StreamEvent::Tag { name, content } if name == "thinking" => {
            history.add_thinking(content.clone())
        }
        StreamEvent::Tag { content, .. } => history.add_tool_output(content.clone()),
        StreamEvent::Done => {}
    }
}

/// Filter the live history and hand the result to the store.
async fn archive_conversation(state: &AppState) {
    let archived = {
        let history = state.history.lock().await;
        state.filter.apply(history.snapshot())
    };
    let id = state.conversation_id.lock().await.clone();

    let record = ConversationRecord::new(id, archived);
    if let Err(e) = state.store.save(&record).await {
        error!("failed to archive conversation: {e:#}");
    }
}

async fn chat_completions(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ServerError> {
    let last_msg = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
    let prompt = {
        let mut history = state.history.lock().await;
        if !last_msg.is_empty() {
            history.add_user(&last_msg);
        }
        history.format_for_prompt()
    };

    let mut stream = state
        .provider
        .generate_stream(
            &state.config.model,
            prompt,
            Some(state.config.system_prompt.clone()),
        )
        .await
        .map_err(ServerError)?;

    if req.stream {
        let (forwarder, rx) = SseForwarder::channel();
        let state_c = state.clone();

        tokio::spawn(async move {
            let mut session = StreamSession::new(state_c.config.stream_tags.iter().cloned());

            while let Some(chunk_res) = stream.next().await {
                if forwarder.is_closed() {
                    // Client went away; stop consuming upstream.
                    info!("client disconnected, cancelling stream");
                    return;
                }
                let text = match chunk_res {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("upstream stream error: {e:#}");
                        break;
                    }
                };
                for event in session.push_chunk(&text) {
                    record_event(&mut *state_c.history.lock().await, &event);
                    if let Err(e) = forwarder.send(&event) {
                        error!("event serialization bug: {e}");
                        forwarder.close();
                        return;
                    }
                }
            }

            for event in session.finish() {
                record_event(&mut *state_c.history.lock().await, &event);
                if let Err(e) = forwarder.send(&event) {
                    error!("event serialization bug: {e}");
                    forwarder.close();
                    return;
                }
            }
            let _ = forwarder.send(&StreamEvent::Done);

            archive_conversation(&state_c).await;
        });

        let sse = Sse::new(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
            .keep_alive(KeepAlive::default());
        Ok(([(header::CACHE_CONTROL, "no-cache")], sse).into_response())
    } else {
        // Non-streaming fallback: same extraction, one JSON body.
        let mut session = StreamSession::new(state.config.stream_tags.iter().cloned());
        let mut full_response = String::new();
        let mut events = Vec::new();

        while let Some(chunk_res) = stream.next().await {
            match chunk_res {
                Ok(text) => {
                    full_response.push_str(&text);
                    events.extend(session.push_chunk(&text));
                }
                Err(e) => {
                    warn!("upstream stream error: {e:#}");
                    break;
                }
            }
        }
        events.extend(session.finish());

        {
            let mut history = state.history.lock().await;
            for event in &events {
                record_event(&mut history, event);
            }
        }
        archive_conversation(&state).await;

        Ok(Json(ChatResponse {
            choices: vec![Choice {
                message: Message {
                    role: "assistant".to_string(),
                    content: full_response,
                },
            }],
        })
        .into_response())
    }
}
