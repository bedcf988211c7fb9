//! End-to-end tests: chunked session processing, the SSE chat endpoint,
//! and the archive flow behind it.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tempfile::tempdir;
use tower::ServiceExt;

use chat_relay::archive::{ConversationStore, JsonFileStore};
use chat_relay::config::RelayConfig;
use chat_relay::provider::{LLMProvider, TextStream};
use chat_relay::server::{router, AppState};
use chat_relay::stream::{StreamEvent, StreamSession};

/// Provider that replays a fixed chunk script.
struct ScriptedProvider {
    chunks: Vec<String>,
}

impl ScriptedProvider {
    fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(&self, _model: &str, _prompt: String, _system: Option<String>) -> Result<String> {
        Ok(self.chunks.concat())
    }

    async fn generate_stream(
        &self,
        _model: &str,
        _prompt: String,
        _system: Option<String>,
    ) -> Result<TextStream> {
        let chunks: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}

fn test_config(tags: &[&str], archive_dir: &std::path::Path) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.stream_tags = tags.iter().map(|t| t.to_string()).collect();
    config.archive_dir = archive_dir.to_string_lossy().into_owned();
    config
}

fn sse_events(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).expect("valid event payload"))
        .collect()
}

#[test]
fn test_chunked_session_yields_tag_then_text() {
    // The canonical split: "<a>", "foo", "</a>bar" -> tag a("foo"), text "bar".
    let mut session = StreamSession::new(["a"]);

    let mut events = Vec::new();
    for chunk in ["<a>", "foo", "</a>bar"] {
        events.extend(session.push_chunk(chunk));
    }
    events.extend(session.finish());

    assert_eq!(
        events,
        vec![
            StreamEvent::Tag {
                name: "a".into(),
                content: "foo".into()
            },
            StreamEvent::Text {
                content: "bar".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_sse_endpoint_streams_events_in_order() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(&["<a>", "foo", "</a>bar"]));
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let state = AppState::new(provider, store.clone(), test_config(&["a"], dir.path()));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "messages": [{ "role": "user", "content": "hi" }],
                "stream": true,
            })
            .to_string(),
        ))
        .unwrap();

    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let events = sse_events(&body);

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["type"], "tag");
    assert_eq!(events[0]["name"], "a");
    assert_eq!(events[0]["content"], "foo");
    assert_eq!(events[1]["type"], "text");
    assert_eq!(events[1]["content"], "bar");
    assert_eq!(events[2]["type"], "done");

    // The finished conversation was archived through the store.
    let ids = store.list().await.unwrap();
    assert_eq!(ids.len(), 1);
    let record = store.load(&ids[0]).await.unwrap().unwrap();
    assert_eq!(record.messages.len(), 3); // user, tool segment, trailing text
    assert_eq!(record.messages[0].content, "hi");
    assert_eq!(record.messages[1].tool_data.as_deref(), Some("foo"));
    assert_eq!(record.messages[2].content, "bar");
}

#[tokio::test]
async fn test_archive_truncates_but_live_history_does_not() {
    let dir = tempdir().unwrap();
    let noisy = format!("Tool web_search returned: {}", "x".repeat(2000));
    let provider = Arc::new(ScriptedProvider::new(&[&noisy]));
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let state = AppState::new(
        provider,
        store.clone(),
        test_config(&["thinking", "tool"], dir.path()),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "messages": [{ "role": "user", "content": "search something" }],
                "stream": false,
            })
            .to_string(),
        ))
        .unwrap();

    let response = router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Live history keeps the full content.
    let history_req = Request::builder()
        .uri("/v1/history")
        .body(Body::empty())
        .unwrap();
    let history_res = router(state.clone()).oneshot(history_req).await.unwrap();
    let bytes = axum::body::to_bytes(history_res.into_body(), usize::MAX)
        .await
        .unwrap();
    let live: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    let live_assistant = live
        .iter()
        .find(|m| m["role"] == "assistant")
        .expect("assistant message in live history");
    assert!(live_assistant["content"].as_str().unwrap().len() > 2000);

    // The archived copy is capped.
    let ids = store.list().await.unwrap();
    let record = store.load(&ids[0]).await.unwrap().unwrap();
    let archived = record
        .messages
        .iter()
        .find(|m| m.content.contains("Tool web_search returned:"))
        .expect("archived tool output");
    assert!(archived.content.chars().count() <= 500);
    assert!(archived.content.contains("truncated"));
}

#[tokio::test]
async fn test_status_endpoint() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let state = AppState::new(provider, store, test_config(&["thinking"], dir.path()));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["service"], "chat_relay");
    assert_eq!(status["live_messages"], 0);
}
