//! chat_relay
//!
//! Web backend proxying a chat/assistant experience: real-time SSE
//! streaming with tag extraction, plus bounded conversation archival.

use anyhow::Result;
use ollama_rs::Ollama;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::archive::JsonFileStore;
use chat_relay::config::RelayConfig;
use chat_relay::provider::{LLMProvider, OllamaProvider, OpenAICompatibleProvider};
use chat_relay::server::{run_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging once at process start; components only emit events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = RelayConfig::from_env();
    info!(
        model = %config.model,
        addr = %config.listen_addr,
        tags = ?config.stream_tags,
        "starting chat relay"
    );

    let provider: Arc<dyn LLMProvider> = match std::env::var("RELAY_UPSTREAM_URL") {
        Ok(base_url) => {
            let api_key = std::env::var("RELAY_UPSTREAM_KEY").ok();
            Arc::new(OpenAICompatibleProvider::new(base_url, api_key))
        }
        Err(_) => Arc::new(OllamaProvider::new(Ollama::default())),
    };

    let store = Arc::new(JsonFileStore::new(&config.archive_dir));
    let state = AppState::new(provider, store, config);

    run_server(state).await
}
