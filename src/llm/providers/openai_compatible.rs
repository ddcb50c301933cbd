//! Chat-completions adapter for OpenAI-shaped APIs: OpenAI itself,
//! Dashscope/Qwen, Groq, and local Ollama (selected via `api_base`).

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::errors::{PilotError, PilotResult};
use crate::llm::provider::VlmProvider;
use crate::llm::types::{ContentItem, VlmReply, VlmRequest};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Local Ollama endpoints need no auth header.
    fn is_local(&self) -> bool {
        self.api_base.contains("localhost") || self.api_base.contains("127.0.0.1")
    }

    async fn try_complete(&self, request: &VlmRequest<'_>) -> PilotResult<VlmReply> {
        let mut wire_messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system,
        })];
        for msg in request.messages {
            wire_messages.push(serde_json::json!({
                "role": "user",
                "content": to_openai_parts(&msg.content),
            }));
        }

        let body = serde_json::json!({
            "model": request.model,
            "messages": wire_messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        tracing::debug!(
            provider = %self.id,
            model = %request.model,
            messages = wire_messages.len(),
            "sending chat completion request"
        );

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&body);
        if !self.is_local() {
            req = req.bearer_auth(&self.api_key);
        }
        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(PilotError::Provider(format!("{status}: {err_body}")));
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        tracing::info!(provider = %self.id, content_len = text.len(), tokens, "chat completion received");
        Ok(VlmReply { text, tokens })
    }
}

#[async_trait]
impl VlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &VlmRequest<'_>) -> VlmReply {
        match self.try_complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(provider = %self.id, error = %e, "completion failed");
                VlmReply {
                    text: format!("Error from provider '{}': {e}", self.id),
                    tokens: 0,
                }
            }
        }
    }
}

/// Convert content items into OpenAI message parts. Image paths are read and
/// inlined as data URIs here; the core never touches the files. A path that
/// cannot be read degrades to a text part so one stale screenshot reference
/// does not sink the whole request.
fn to_openai_parts(items: &[ContentItem]) -> Vec<serde_json::Value> {
    let mut parts = Vec::new();
    for item in items {
        match item {
            ContentItem::Text { text } => {
                parts.push(serde_json::json!({"type": "text", "text": text}));
            }
            ContentItem::Image { path } => match std::fs::read(path) {
                Ok(bytes) => {
                    let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    parts.push(serde_json::json!({
                        "type": "image_url",
                        "image_url": {"url": format!("data:image/png;base64,{b64}")},
                    }));
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "screenshot unreadable, sending placeholder");
                    parts.push(serde_json::json!({
                        "type": "text",
                        "text": format!("[unreadable screenshot: {path}]"),
                    }));
                }
            },
            // The VLM path never produces these itself; flatten any text and
            // drop nested images.
            ContentItem::ToolResult { content } => {
                for inner in content {
                    if let ContentItem::Text { text } = inner {
                        parts.push(serde_json::json!({"type": "text", "text": text}));
                    }
                }
            }
        }
    }
    parts
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}
