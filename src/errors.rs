use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Unrecognized action '{0}'")]
    UnrecognizedAction(String),

    #[error("Action '{0}' requires a value field")]
    MissingActionValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type PilotResult<T> = Result<T, PilotError>;
