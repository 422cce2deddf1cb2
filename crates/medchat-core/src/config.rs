use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MedchatError, Result};
use crate::types::BackendSelection;

/// Environment variable holding the AWS region for the index and Bedrock.
pub const ENV_REGION: &str = "AWS_REGION";
/// Environment variable holding the retrieval index identifier.
pub const ENV_INDEX_ID: &str = "KENDRA_INDEX_ID";
/// Environment variable holding an optional bearer key for model endpoints.
pub const ENV_LLM_API_KEY: &str = "MEDCHAT_LLM_API_KEY";

/// Largest page the retrieval index returns for one query.
pub const MAX_TOP_K: usize = 100;

/// Top-level configuration for medchat.
///
/// Loaded from `medchat.toml` by default. Every section falls back
/// to its defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedchatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl MedchatConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MedchatConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path` if the file exists.
    ///
    /// A missing file is `Ok(None)`; a present but unreadable or malformed
    /// file is an error.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No configuration file at {}", path.display());
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Environment values win over the file for the region, the index id and
    /// the model API key. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = var(ENV_REGION) {
            self.retrieval.region = Some(region);
        }
        if let Some(index_id) = var(ENV_INDEX_ID) {
            self.retrieval.index_id = Some(index_id);
        }
        if let Some(key) = var(ENV_LLM_API_KEY) {
            self.llm.api_key = Some(SecretString::from(key));
        }
    }

    /// Check the configuration is usable for `backend`.
    ///
    /// Every failure here is fatal at startup.
    pub fn validate(&self, backend: BackendSelection) -> Result<()> {
        if self.chat.max_history == 0 {
            return Err(MedchatError::Config(
                "chat.max_history must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_k > MAX_TOP_K {
            return Err(MedchatError::Config(format!(
                "retrieval.top_k must be between 1 and {}, got {}",
                MAX_TOP_K, self.retrieval.top_k
            )));
        }

        if self.retrieval.provider == RetrievalProvider::Kendra {
            if self.retrieval.region.is_none() && self.retrieval.endpoint.is_none() {
                return Err(MedchatError::Config(format!(
                    "{} must be set for the kendra retriever",
                    ENV_REGION
                )));
            }
            if self.retrieval.index_id.is_none() {
                return Err(MedchatError::Config(format!(
                    "{} must be set for the kendra retriever",
                    ENV_INDEX_ID
                )));
            }
        }

        match backend {
            BackendSelection::Llama2 => {
                if self.llm.endpoint.is_none() {
                    return Err(MedchatError::Config(
                        "llm.endpoint must be set for the llama2 backend".to_string(),
                    ));
                }
            }
            BackendSelection::BedrockTitan
            | BackendSelection::BedrockClaude
            | BackendSelection::BedrockClaudev2 => {
                if self.bedrock_endpoint().is_none() {
                    return Err(MedchatError::Config(format!(
                        "{} or llm.endpoint must be set for the {} backend",
                        ENV_REGION, backend
                    )));
                }
            }
        }

        Ok(())
    }

    /// Base URL for Bedrock runtime calls: the explicit endpoint, or the
    /// regional default.
    pub fn bedrock_endpoint(&self) -> Option<String> {
        self.llm.endpoint.clone().or_else(|| {
            self.retrieval
                .region
                .as_ref()
                .map(|r| format!("https://bedrock-runtime.{}.amazonaws.com", r))
        })
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP API port.
    pub port: u16,
    /// Directory holding the canned question documents.
    pub docs_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 3030,
            docs_dir: "resources/docs".to_string(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of turns kept in each session's history.
    pub max_history: usize,
    /// Longest accepted question, in characters.
    pub max_message_length: usize,
    /// Idle minutes after which a session is discarded.
    pub session_timeout_minutes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: 5,
            max_message_length: 2000,
            session_timeout_minutes: 30,
        }
    }
}

/// Which retriever implementation backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalProvider {
    /// Remote ranked-retrieval index.
    Kendra,
    /// Keyword ranking over the local document corpus.
    Local,
}

/// Retriever settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub provider: RetrievalProvider,
    /// AWS region; usually supplied through `AWS_REGION`.
    pub region: Option<String>,
    /// Index identifier; usually supplied through `KENDRA_INDEX_ID`.
    pub index_id: Option<String>,
    /// Overrides the regional index endpoint.
    pub endpoint: Option<String>,
    /// Documents fetched per question.
    pub top_k: usize,
    /// Upper bound on one retrieval call, in seconds.
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            provider: RetrievalProvider::Kendra,
            region: None,
            index_id: None,
            endpoint: None,
            top_k: 5,
            timeout_secs: 10,
        }
    }
}

impl RetrievalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Language model settings shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Overrides the model endpoint (required for llama2).
    pub endpoint: Option<String>,
    /// Sampling temperature, if the provider accepts one.
    pub temperature: Option<f32>,
    /// Generation length limit, if the provider accepts one.
    pub max_tokens: Option<u32>,
    /// Upper bound on one model call, in seconds.
    pub timeout_secs: u64,
    /// Retries after a rate-limit response.
    pub max_retries: u32,
    /// Base backoff between rate-limit retries, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Bearer key for the model endpoint. Only read from the environment.
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
            max_retries: 1,
            retry_base_delay_ms: 500,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn kendra_ready() -> MedchatConfig {
        let mut config = MedchatConfig::default();
        config.apply_env_with(env(&[
            (ENV_REGION, "us-east-1"),
            (ENV_INDEX_ID, "idx-123"),
        ]));
        config
    }

    #[test]
    fn test_default_config() {
        let config = MedchatConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 3030);
        assert_eq!(config.general.docs_dir, "resources/docs");
        assert_eq!(config.chat.max_history, 5);
        assert_eq!(config.chat.max_message_length, 2000);
        assert_eq!(config.retrieval.provider, RetrievalProvider::Kendra);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.max_retries, 1);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "debug"

[retrieval]
provider = "local"
top_k = 3
"#;
        let file = create_temp_config(content);
        let config = MedchatConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 3030);
        assert_eq!(config.retrieval.provider, RetrievalProvider::Local);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.timeout_secs, 10);
        assert_eq!(config.chat.max_history, 5);
    }

    #[test]
    fn test_load_full_llm_section() {
        let content = r#"
[llm]
endpoint = "http://localhost:8080"
temperature = 0.2
max_tokens = 512
timeout_secs = 5
max_retries = 0
retry_base_delay_ms = 50
"#;
        let file = create_temp_config(content);
        let config = MedchatConfig::load(file.path()).unwrap();
        assert_eq!(config.llm.endpoint.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.llm.max_tokens, Some(512));
        assert_eq!(config.llm.timeout(), Duration::from_secs(5));
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.llm.retry_base_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = MedchatConfig::load(file.path());
        assert!(matches!(result, Err(MedchatError::Config(_))));
    }

    #[test]
    fn test_load_unknown_provider_rejected() {
        let file = create_temp_config("[retrieval]\nprovider = \"elastic\"\n");
        assert!(MedchatConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_if_present_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = MedchatConfig::load_if_present(&dir.path().join("medchat.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_if_present_reads_file() {
        let file = create_temp_config("[retrieval]\ntop_k = 7\n");
        let config = MedchatConfig::load_if_present(file.path()).unwrap().unwrap();
        assert_eq!(config.retrieval.top_k, 7);
    }

    #[test]
    fn test_load_if_present_malformed_is_fatal() {
        let file = create_temp_config("[chat\nmax_history = ");
        assert!(matches!(
            MedchatConfig::load_if_present(file.path()),
            Err(MedchatError::Config(_))
        ));
    }

    #[test]
    fn test_api_key_never_in_file() {
        let file = create_temp_config("[llm]\napi_key = \"from-file\"\n");
        let config = MedchatConfig::load(file.path()).unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_apply_env_overrides_file_values() {
        let mut config = MedchatConfig::default();
        config.retrieval.region = Some("eu-west-1".to_string());
        config.apply_env_with(env(&[
            (ENV_REGION, "us-east-1"),
            (ENV_INDEX_ID, "idx-123"),
            (ENV_LLM_API_KEY, "abc"),
        ]));
        assert_eq!(config.retrieval.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.retrieval.index_id.as_deref(), Some("idx-123"));
        assert_eq!(
            config.llm.api_key.as_ref().unwrap().expose_secret(),
            "abc"
        );
    }

    #[test]
    fn test_apply_env_ignores_empty_values() {
        let mut config = MedchatConfig::default();
        config.retrieval.region = Some("eu-west-1".to_string());
        config.apply_env_with(env(&[(ENV_REGION, "  ")]));
        assert_eq!(config.retrieval.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_validate_missing_region_is_fatal() {
        let mut config = MedchatConfig::default();
        config.apply_env_with(env(&[(ENV_INDEX_ID, "idx-123")]));
        let err = config.validate(BackendSelection::BedrockTitan).unwrap_err();
        assert!(matches!(err, MedchatError::Config(_)));
        assert!(err.to_string().contains(ENV_REGION));
    }

    #[test]
    fn test_validate_missing_index_is_fatal() {
        let mut config = MedchatConfig::default();
        config.apply_env_with(env(&[(ENV_REGION, "us-east-1")]));
        let err = config.validate(BackendSelection::BedrockClaude).unwrap_err();
        assert!(err.to_string().contains(ENV_INDEX_ID));
    }

    #[test]
    fn test_validate_bedrock_ok_with_environment() {
        let config = kendra_ready();
        assert!(config.validate(BackendSelection::BedrockTitan).is_ok());
        assert!(config.validate(BackendSelection::BedrockClaudev2).is_ok());
    }

    #[test]
    fn test_validate_llama2_needs_endpoint() {
        let mut config = kendra_ready();
        assert!(config.validate(BackendSelection::Llama2).is_err());
        config.llm.endpoint = Some("http://localhost:8080".to_string());
        assert!(config.validate(BackendSelection::Llama2).is_ok());
    }

    #[test]
    fn test_validate_local_provider_skips_index_environment() {
        let mut config = MedchatConfig::default();
        config.retrieval.provider = RetrievalProvider::Local;
        config.llm.endpoint = Some("http://localhost:8080".to_string());
        assert!(config.validate(BackendSelection::Llama2).is_ok());
        assert!(config.validate(BackendSelection::BedrockTitan).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_history_and_top_k() {
        let mut config = kendra_ready();
        config.chat.max_history = 0;
        assert!(config.validate(BackendSelection::BedrockTitan).is_err());

        let mut config = kendra_ready();
        config.retrieval.top_k = 0;
        assert!(config.validate(BackendSelection::BedrockTitan).is_err());
    }

    #[test]
    fn test_validate_top_k_upper_bound() {
        let mut config = kendra_ready();
        config.retrieval.top_k = MAX_TOP_K;
        assert!(config.validate(BackendSelection::BedrockTitan).is_ok());

        config.retrieval.top_k = MAX_TOP_K + 1;
        let err = config.validate(BackendSelection::BedrockTitan).unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn test_bedrock_endpoint_defaults_to_region() {
        let config = kendra_ready();
        assert_eq!(
            config.bedrock_endpoint().as_deref(),
            Some("https://bedrock-runtime.us-east-1.amazonaws.com")
        );

        let mut config = kendra_ready();
        config.llm.endpoint = Some("http://127.0.0.1:9000".to_string());
        assert_eq!(
            config.bedrock_endpoint().as_deref(),
            Some("http://127.0.0.1:9000")
        );
    }
}
