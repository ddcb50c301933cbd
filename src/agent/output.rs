//! Display callback seam. The engine emits rendered HTML/text fragments per
//! step; what happens to them (chat UI, log, nothing) is the sink's concern.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Bot,
    User,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Bot => "bot",
            Sender::User => "user",
        }
    }
}

pub trait OutputSink: Send + Sync {
    fn emit(&self, content: &str, sender: Sender);
}

/// Default sink: forwards every fragment to the tracing pipeline.
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn emit(&self, content: &str, sender: Sender) {
        tracing::info!(sender = sender.as_str(), content_len = content.len(), "{content}");
    }
}

pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&self, _content: &str, _sender: Sender) {}
}
