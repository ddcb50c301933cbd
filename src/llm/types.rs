use serde::{Deserialize, Serialize};

/// One turn of the caller-owned conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentItem>,
}

impl Message {
    pub fn user(content: Vec<ContentItem>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    pub fn assistant(text: String) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![ContentItem::Text { text }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    /// Screenshot referenced by file path; the core treats the path as an
    /// opaque string, only provider adapters ever read the file.
    Image { path: String },
    /// Wrapper some providers emit around tool output; may carry further
    /// images that count against the retention budget.
    ToolResult { content: Vec<ContentItem> },
}

/// A single completion request as the engine hands it to a provider adapter.
#[derive(Debug, Clone)]
pub struct VlmRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Provider outcome. On any transport or decode failure `text` carries a
/// human-readable error description and `tokens` is zero; the response
/// pipeline then treats it like any other unparseable reply.
#[derive(Debug, Clone)]
pub struct VlmReply {
    pub text: String,
    pub tokens: u64,
}
