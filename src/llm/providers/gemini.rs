//! Adapter for the Gemini generateContent API.
//!
//! The proxy, when configured, is attached to this adapter's own HTTP client
//! at construction time. Nothing touches process-wide environment state, so
//! concurrent callers need no coordination.

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::errors::{PilotError, PilotResult};
use crate::llm::provider::VlmProvider;
use crate::llm::types::{ContentItem, VlmReply, VlmRequest};

#[derive(Debug)]
pub struct GeminiProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        id: String,
        api_base: String,
        api_key: String,
        proxy_url: Option<&str>,
    ) -> PilotResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(url) = proxy_url.filter(|u| !u.trim().is_empty()) {
            tracing::info!(provider = %id, proxy = %url, "routing Gemini traffic through proxy");
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| PilotError::Config(format!("invalid proxy_url '{url}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build()?;
        Ok(Self {
            id,
            api_base,
            api_key,
            client,
        })
    }

    async fn try_complete(&self, request: &VlmRequest<'_>) -> PilotResult<VlmReply> {
        let mut parts = vec![serde_json::json!({"text": request.system})];
        for msg in request.messages {
            collect_parts(&msg.content, &mut parts);
        }

        let body = serde_json::json!({
            "contents": [{"parts": parts}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, request.model, self.api_key
        );
        tracing::debug!(provider = %self.id, model = %request.model, "sending generateContent request");

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(PilotError::Provider(format!("{status}: {err_body}")));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        // The API does not always report usage; estimate from word count
        // rather than claiming zero for a successful call.
        let tokens = parsed
            .usage_metadata
            .map(|u| u.total_token_count)
            .unwrap_or_else(|| text.split_whitespace().count() as u64);

        tracing::info!(provider = %self.id, content_len = text.len(), tokens, "generateContent received");
        Ok(VlmReply { text, tokens })
    }
}

#[async_trait]
impl VlmProvider for GeminiProvider {
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

/// Flatten message content into Gemini `parts`, inlining referenced images.
fn collect_parts(items: &[ContentItem], parts: &mut Vec<serde_json::Value>) {
    for item in items {
        match item {
            ContentItem::Text { text } => {
                parts.push(serde_json::json!({"text": text}));
            }
            ContentItem::Image { path } => match std::fs::read(path) {
                Ok(bytes) => {
                    let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    parts.push(serde_json::json!({
                        "inline_data": {"mime_type": mime_for(path), "data": b64},
                    }));
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "screenshot unreadable, sending placeholder");
                    parts.push(serde_json::json!({
                        "text": format!("[unreadable screenshot: {path}]"),
                    }));
                }
            },
            ContentItem::ToolResult { content } => collect_parts(content, parts),
        }
    }
}

fn mime_for(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u64,
}
