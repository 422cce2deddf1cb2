//! Backend adapters: the retriever, model and templates behind one backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use medchat_core::config::RetrievalProvider;
use medchat_core::types::{BackendSelection, RetrievedDocument};
use medchat_core::{Corpus, MedchatConfig, MedchatError};
use medchat_llm::{
    BedrockClient, BedrockModel, GenerationOptions, LanguageModelClient, LlamaEndpointClient,
    ReliableClient, RetryPolicy,
};
use medchat_retrieval::{CorpusRetriever, KendraRetriever, Retriever};

use crate::error::ChatError;
use crate::prompt::PromptTemplates;

/// Everything the orchestrator needs from a backend.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn selection(&self) -> BackendSelection;

    /// Documents to request per turn.
    fn top_k(&self) -> usize;

    fn prompt_templates(&self) -> &PromptTemplates;

    async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, ChatError>;

    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

/// A backend assembled from a retriever and a model client.
pub struct ConfiguredBackend {
    selection: BackendSelection,
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn LanguageModelClient>,
    templates: PromptTemplates,
    options: GenerationOptions,
    top_k: usize,
    retrieval_timeout: Duration,
}

impl ConfiguredBackend {
    /// Backend with the selection's templates, top-k 5 and a 10s retrieval
    /// timeout.
    pub fn new(
        selection: BackendSelection,
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModelClient>,
    ) -> Self {
        Self {
            selection,
            retriever,
            model,
            templates: PromptTemplates::for_backend(selection),
            options: GenerationOptions::default(),
            top_k: 5,
            retrieval_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Build the backend named by `selection` from validated configuration.
    ///
    /// `corpus` backs the local retriever when `retrieval.provider` is
    /// `local`.
    pub fn from_config(
        selection: BackendSelection,
        config: &MedchatConfig,
        corpus: Arc<Corpus>,
    ) -> Result<Self, MedchatError> {
        let retriever: Arc<dyn Retriever> = match config.retrieval.provider {
            RetrievalProvider::Local => Arc::new(CorpusRetriever::new(corpus)),
            RetrievalProvider::Kendra => {
                let index_id = config
                    .retrieval
                    .index_id
                    .clone()
                    .ok_or_else(|| MedchatError::Config("retrieval index id is not set".into()))?;
                let retriever = match (&config.retrieval.endpoint, &config.retrieval.region) {
                    (Some(endpoint), _) => KendraRetriever::with_endpoint(endpoint.clone(), index_id),
                    (None, Some(region)) => KendraRetriever::new(region, index_id),
                    (None, None) => {
                        return Err(MedchatError::Config(
                            "retrieval region is not set".into(),
                        ))
                    }
                }
                .map_err(|e| MedchatError::Config(e.to_string()))?;
                Arc::new(retriever)
            }
        };

        let api_key = config.llm.api_key.clone();
        let raw: Box<dyn LanguageModelClient> = match BedrockModel::for_backend(selection) {
            Some(model) => {
                let endpoint = config
                    .bedrock_endpoint()
                    .ok_or_else(|| MedchatError::Config("Bedrock endpoint is not set".into()))?;
                Box::new(
                    BedrockClient::new(endpoint, model, api_key)
                        .map_err(|e| MedchatError::Config(e.to_string()))?,
                )
            }
            None => {
                let endpoint = config.llm.endpoint.clone().ok_or_else(|| {
                    MedchatError::Config("llm.endpoint is required for llama2".into())
                })?;
                Box::new(
                    LlamaEndpointClient::new(endpoint, api_key)
                        .map_err(|e| MedchatError::Config(e.to_string()))?,
                )
            }
        };

        let policy = RetryPolicy {
            max_retries: config.llm.max_retries,
            base_delay: config.llm.retry_base_delay(),
            timeout: config.llm.timeout(),
            ..RetryPolicy::default()
        };
        let model: Arc<dyn LanguageModelClient> = Arc::new(ReliableClient::new(raw, policy));

        info!(
            backend = %selection,
            retriever = retriever.name(),
            model = model.name(),
            top_k = config.retrieval.top_k,
            "Backend configured"
        );

        Ok(Self::new(selection, retriever, model)
            .with_top_k(config.retrieval.top_k)
            .with_options(GenerationOptions::new(
                config.llm.temperature,
                config.llm.max_tokens,
            ))
            .with_retrieval_timeout(config.retrieval.timeout()))
    }
}

#[async_trait]
impl BackendAdapter for ConfiguredBackend {
    fn selection(&self) -> BackendSelection {
        self.selection
    }

    fn top_k(&self) -> usize {
        self.top_k
    }

    fn prompt_templates(&self) -> &PromptTemplates {
        &self.templates
    }

    async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, ChatError> {
        let docs = tokio::time::timeout(
            self.retrieval_timeout,
            self.retriever.retrieve(question, top_k),
        )
        .await
        .map_err(|_| ChatError::Timeout {
            stage: "retrieval",
            after: self.retrieval_timeout,
        })??;
        Ok(docs)
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        Ok(self.model.generate(prompt, &self.options).await?)
    }
}
