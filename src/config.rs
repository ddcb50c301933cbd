use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{PilotError, PilotResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    pub providers: HashMap<String, ProviderEntry>,
    /// Model aliases as shown in the UI, e.g. "omniparser + gpt-4o".
    #[serde(default)]
    pub models: HashMap<String, ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Screenshot retention budget per conversation; absent = no trimming.
    #[serde(default)]
    pub only_recent_images: Option<usize>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            only_recent_images: None,
            output_dir: default_output_dir(),
        }
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_output_dir() -> String {
    "./tmp/outputs".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    pub api_base: String,
    /// Optional API key stored in config.toml (falls back to env var SCREENPILOT_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Routes the provider's HTTP client through a proxy, e.g. "http://127.0.0.1:10808".
    #[serde(default)]
    pub proxy_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompatible,
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    /// Must match a key under [providers.*].
    pub provider: String,
    /// Model name sent to the API.
    pub model: String,
    /// Per-model cap; the effective limit is min(this, agent.max_tokens).
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: f64,
    /// USD per million tokens, used for the running cost total.
    #[serde(default)]
    pub price_per_mtok: f64,
}

fn resolve_config_path() -> PilotResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(PilotError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> PilotResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        providers = config.providers.len(),
        models = config.models.len(),
        "config loaded"
    );
    Ok(config)
}
