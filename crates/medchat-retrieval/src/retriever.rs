use async_trait::async_trait;

use medchat_core::types::RetrievedDocument;

use crate::error::RetrievalError;

/// Ranked document retrieval for a standalone question.
///
/// Implementations return at most `top_k` documents, best first. An empty
/// list is a valid answer and means nothing matched.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}
