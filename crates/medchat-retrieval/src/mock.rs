//! Scripted retriever for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use medchat_core::types::RetrievedDocument;

use crate::error::RetrievalError;
use crate::retriever::Retriever;

/// Returns a fixed document list (or a fixed error) and records every query.
pub struct MockRetriever {
    documents: Vec<RetrievedDocument>,
    error: Option<RetrievalError>,
    queries: Mutex<Vec<String>>,
}

impl MockRetriever {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self {
            documents,
            error: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A retriever whose every call fails with `error`.
    pub fn failing(error: RetrievalError) -> Self {
        Self {
            documents: Vec::new(),
            error: Some(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far, oldest first.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }
}
