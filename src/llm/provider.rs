use async_trait::async_trait;

use crate::llm::types::{VlmReply, VlmRequest};

/// Unified VLM provider trait. Adapters must never let an error cross this
/// boundary: transport, auth, and decode failures are converted into a
/// [`VlmReply`] whose text describes the failure and whose token count is
/// zero, so the step pipeline degrades uniformly regardless of provider.
#[async_trait]
pub trait VlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches the config.toml key).
    fn name(&self) -> &str;

    async fn complete(&self, request: &VlmRequest<'_>) -> VlmReply;
}
