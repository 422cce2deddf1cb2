use thiserror::Error;

/// Top-level error type for the medchat workspace.
///
/// Startup problems (bad backend token, missing environment, unreadable
/// config or corpus) land here. Per-turn failures have their own types in
/// the retrieval, model and chat crates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MedchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MedchatError {
    fn from(err: toml::de::Error) -> Self {
        MedchatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MedchatError {
    fn from(err: toml::ser::Error) -> Self {
        MedchatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MedchatError {
    fn from(err: serde_json::Error) -> Self {
        MedchatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for medchat startup operations.
pub type Result<T> = std::result::Result<T, MedchatError>;
