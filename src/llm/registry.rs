use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, ModelEntry, ProviderKind};
use crate::errors::{PilotError, PilotResult};
use crate::llm::provider::VlmProvider;
use crate::llm::providers::gemini::GeminiProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;

/// Everything the engine needs to call one configured model alias.
#[derive(Debug, Clone)]
pub struct CallProfile {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// USD per million tokens.
    pub price_per_mtok: f64,
}

/// Registry of provider adapters plus the model aliases that route to them,
/// keyed by their config.toml identifiers.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn VlmProvider>>,
    models: HashMap<String, ModelEntry>,
    agent_max_tokens: u32,
}

impl ProviderRegistry {
    pub fn new(agent_max_tokens: u32) -> Self {
        Self {
            providers: HashMap::new(),
            models: HashMap::new(),
            agent_max_tokens,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn VlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn list_models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Resolve a model alias (e.g. "omniparser + gpt-4o") to its provider
    /// adapter and call profile. The effective token cap is the smaller of
    /// the model's own cap and the agent-wide limit.
    pub fn resolve(&self, alias: &str) -> PilotResult<(Arc<dyn VlmProvider>, CallProfile)> {
        let entry = self
            .models
            .get(alias)
            .ok_or_else(|| PilotError::Config(format!("model alias '{alias}' not configured")))?;
        let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
            PilotError::Config(format!(
                "model alias '{alias}' references unknown provider '{}'",
                entry.provider
            ))
        })?;

        let max_tokens = entry
            .max_tokens
            .unwrap_or(self.agent_max_tokens)
            .min(self.agent_max_tokens);
        tracing::debug!(
            alias,
            provider = %entry.provider,
            model = %entry.model,
            max_tokens,
            "resolved model alias"
        );
        Ok((
            provider,
            CallProfile {
                model: entry.model.clone(),
                max_tokens,
                temperature: entry.temperature,
                price_per_mtok: entry.price_per_mtok,
            },
        ))
    }

    /// Build a registry from the loaded app config. API keys are read from
    /// environment variables named `SCREENPILOT_<ID>_API_KEY`, falling back
    /// to the key stored in the config entry.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(config.agent.max_tokens);
        for (id, entry) in &config.providers {
            let api_key = std::env::var(format!("SCREENPILOT_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            match entry.kind {
                ProviderKind::OpenaiCompatible => {
                    registry.register(Arc::new(OpenAiCompatibleProvider::new(
                        id.clone(),
                        entry.api_base.clone(),
                        api_key,
                    )));
                }
                ProviderKind::Gemini => {
                    match GeminiProvider::new(
                        id.clone(),
                        entry.api_base.clone(),
                        api_key,
                        entry.proxy_url.as_deref(),
                    ) {
                        Ok(provider) => registry.register(Arc::new(provider)),
                        Err(e) => {
                            tracing::error!(provider = %id, error = %e, "skipping provider");
                        }
                    }
                }
            }
        }
        registry.models = config.models.clone();
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        toml::from_str(
            r#"
            [agent]
            max_tokens = 4096

            [providers.dashscope]
            kind = "openai_compatible"
            api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
            api_key = "from-config"

            [models."omniparser + qwen2.5vl"]
            provider = "dashscope"
            model = "qwen2.5-vl-72b-instruct"
            max_tokens = 2048
            price_per_mtok = 2.2

            [models."omniparser + gpt-4o"]
            provider = "missing"
            model = "gpt-4o-2024-11-20"
        "#,
        )
        .unwrap()
    }

    #[test]
    fn resolves_alias_with_model_level_cap() {
        let registry = ProviderRegistry::from_config(&sample_config());
        let (provider, profile) = registry.resolve("omniparser + qwen2.5vl").unwrap();
        assert_eq!(provider.name(), "dashscope");
        assert_eq!(profile.model, "qwen2.5-vl-72b-instruct");
        assert_eq!(profile.max_tokens, 2048);
        assert!((profile.price_per_mtok - 2.2).abs() < f64::EPSILON);
    }

    #[test]
    fn alias_without_cap_uses_agent_limit() {
        let mut config = sample_config();
        config
            .models
            .get_mut("omniparser + qwen2.5vl")
            .unwrap()
            .max_tokens = None;
        let registry = ProviderRegistry::from_config(&config);
        let (_, profile) = registry.resolve("omniparser + qwen2.5vl").unwrap();
        assert_eq!(profile.max_tokens, 4096);
    }

    #[test]
    fn unknown_alias_and_dangling_provider_are_config_errors() {
        let registry = ProviderRegistry::from_config(&sample_config());
        assert!(matches!(
            registry.resolve("omniparser + o1"),
            Err(PilotError::Config(_))
        ));
        assert!(matches!(
            registry.resolve("omniparser + gpt-4o"),
            Err(PilotError::Config(_))
        ));
    }
}
