//! Upstream model providers
//!
//! The relay only ever sees a stream of text chunks; which model produced
//! them is hidden behind `LLMProvider`. Ships an Ollama client and a
//! generic OpenAI-compatible client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::pin::Pin;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

/// Chunked model output: arbitrary split points, arbitrary chunk sizes.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>)
        -> Result<String>;

    async fn generate_stream(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
    ) -> Result<TextStream>;
}

pub struct OllamaProvider {
    client: ollama_rs::Ollama,
}

impl OllamaProvider {
    pub fn new(client: ollama_rs::Ollama) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(ChatMessage::system(sys));
        }
        messages.push(ChatMessage::user(prompt));

        let res = self
            .client
            .send_chat_messages(ChatMessageRequest::new(model.to_string(), messages))
            .await?;

        Ok(res.message.content)
    }

    async fn generate_stream(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
    ) -> Result<TextStream> {
        use ollama_rs::generation::completion::request::GenerationRequest;

        let mut request = GenerationRequest::new(model.to_string(), prompt);
        if let Some(sys) = system {
            request = request.system(sys);
        }

        let stream = self.client.generate_stream(request).await?;
        let mapped = stream.map(|item| match item {
            Ok(responses) => Ok(responses
                .into_iter()
                .map(|r| r.response)
                .collect::<String>()),
            Err(e) => Err(anyhow!("ollama stream error: {e}")),
        });

        Ok(Box::pin(mapped))
    }
}

pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn request_body(model: &str, prompt: String, system: Option<String>, stream: bool) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        json!({
            "model": model,
            "messages": messages,
            "temperature": 0.7,
            "stream": stream,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Extract the content delta from one SSE line of an OpenAI-style
/// streaming response. `None` for comments, empty keep-alives, the
/// `[DONE]` sentinel, and deltas without content.
fn delta_from_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(String::from)
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        let body = Self::request_body(model, prompt, system, false);

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?.error_for_status()?;
        let json: serde_json::Value = res.json().await?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("Failed to parse content from OpenAI response")?;

        Ok(content.to_string())
    }

    async fn generate_stream(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
    ) -> Result<TextStream> {
        let body = Self::request_body(model, prompt, system, true);

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<String>>();
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut pending = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("upstream byte stream failed: {e}");
                        let _ = tx.send(Err(anyhow!(e)));
                        return;
                    }
                };
                pending.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = pending.find('\n') {
                    let line = pending[..pos].trim().to_string();
                    pending.drain(..=pos);

                    if line.contains("[DONE]") && line.starts_with("data:") {
                        return;
                    }
                    if let Some(delta) = delta_from_sse_line(&line) {
                        if tx.send(Ok(delta)).is_err() {
                            // Consumer gone; stop reading upstream.
                            return;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
