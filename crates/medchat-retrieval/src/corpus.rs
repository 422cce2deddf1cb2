//! Keyword-overlap retriever over the local canned corpus.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use medchat_core::types::RetrievedDocument;
use medchat_core::Corpus;

use crate::error::RetrievalError;
use crate::retriever::Retriever;

/// Terms this short carry no signal ("a", "is", "of", "the").
const MIN_TERM_LEN: usize = 4;

/// Ranks corpus documents by how many distinct query terms they contain.
///
/// Works offline, so it stands in for the remote index in development.
pub struct CorpusRetriever {
    corpus: Arc<Corpus>,
}

impl CorpusRetriever {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl Retriever for CorpusRetriever {
    fn name(&self) -> &str {
        "local"
    }

    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, usize)> = self
            .corpus
            .documents()
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let doc_terms = terms(&doc.text);
                let score = query_terms.intersection(&doc_terms).count();
                (score > 0).then_some((idx, score))
            })
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let documents: Vec<RetrievedDocument> = scored
            .into_iter()
            .take(top_k)
            .filter_map(|(idx, _)| self.corpus.get(idx))
            .map(|doc| RetrievedDocument::new(doc.text.clone(), doc.name.clone()))
            .collect();

        debug!(doc_count = documents.len(), "Corpus retrieval complete");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medchat_core::CorpusDocument;

    fn retriever() -> CorpusRetriever {
        let corpus = Corpus::from_documents(vec![
            CorpusDocument {
                name: "radiology.txt".into(),
                text: "Radiology uses imaging such as X-ray and CT scans.".into(),
            },
            CorpusDocument {
                name: "oncology.txt".into(),
                text: "Oncology is the study and treatment of cancer.".into(),
            },
            CorpusDocument {
                name: "ct.txt".into(),
                text: "A CT scan combines X-ray imaging from many angles. Radiology departments run CT scans.".into(),
            },
        ]);
        CorpusRetriever::new(Arc::new(corpus))
    }

    #[test]
    fn test_terms_drops_short_words_and_folds_case() {
        let t = terms("What IS the Radiology field?");
        assert!(t.contains("radiology"));
        assert!(t.contains("field"));
        assert!(t.contains("what"));
        assert!(!t.contains("is"));
        assert!(!t.contains("the"));
    }

    #[tokio::test]
    async fn test_ranks_by_overlap() {
        let docs = retriever()
            .retrieve("radiology imaging scans", 5)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        // Both match every term; corpus order breaks the tie.
        assert_eq!(docs[0].source_id, "radiology.txt");
        assert_eq!(docs[1].source_id, "ct.txt");
    }

    #[tokio::test]
    async fn test_respects_top_k() {
        let docs = retriever().retrieve("radiology", 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "radiology.txt");
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let docs = retriever().retrieve("dermatology", 5).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_only_stop_words_is_empty() {
        let docs = retriever().retrieve("is it a", 5).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_content_is_document_text() {
        let docs = retriever().retrieve("cancer treatment", 5).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "oncology.txt");
        assert!(docs[0].content.starts_with("Oncology is"));
    }
}
