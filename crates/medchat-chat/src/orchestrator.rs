//! One request/response cycle: rewrite, retrieve, compose, generate, record.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use medchat_core::types::{AnswerResult, RetrievedDocument, Turn};

use crate::backend::BackendAdapter;
use crate::error::ChatError;
use crate::history::HistoryBuffer;
use crate::prompt::PromptComposer;
use crate::rewriter::QuestionRewriter;

/// Keep the first document for each `source_id`, preserving order.
pub fn dedup_by_source(documents: Vec<RetrievedDocument>) -> Vec<RetrievedDocument> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|d| seen.insert(d.source_id.clone()))
        .collect()
}

/// Runs conversation turns against any [`BackendAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationOrchestrator {
    rewriter: QuestionRewriter,
    composer: PromptComposer,
}

impl ConversationOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `question` in the context of `history`.
    ///
    /// On success exactly one turn, `(question, answer_text)`, is appended
    /// to `history`. On any failure `history` is left untouched.
    #[instrument(skip_all, fields(backend = %backend.selection()))]
    pub async fn answer(
        &self,
        backend: &dyn BackendAdapter,
        question: &str,
        history: &mut HistoryBuffer,
    ) -> Result<AnswerResult, ChatError> {
        let started = Instant::now();

        let result = self.run(backend, question, history).await;
        match result {
            Ok((answer_text, documents)) => {
                let source_documents = dedup_by_source(documents);
                history.append(Turn::new(question, answer_text.clone()));
                info!(
                    doc_count = source_documents.len(),
                    history_len = history.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Turn complete"
                );
                Ok(AnswerResult {
                    answer_text,
                    source_documents,
                })
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.error_kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Turn failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        backend: &dyn BackendAdapter,
        question: &str,
        history: &HistoryBuffer,
    ) -> Result<(String, Vec<RetrievedDocument>), ChatError> {
        let turns = history.as_sequence();
        let standalone = self.rewriter.rewrite(backend, &turns, question).await?;
        debug!(standalone = %standalone, "Question rewritten");

        let documents = backend.retrieve(&standalone, backend.top_k()).await?;
        debug!(doc_count = documents.len(), "Documents retrieved");

        let prompt = self
            .composer
            .compose(backend.prompt_templates(), &standalone, &documents);
        debug!(prompt_chars = prompt.len(), "Prompt composed");

        let answer_text = backend.generate(&prompt).await?;
        Ok((answer_text, documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use medchat_core::types::BackendSelection;
    use medchat_llm::{LlmError, MockClient, MockReply};
    use medchat_retrieval::{MockRetriever, RetrievalError};

    use crate::backend::ConfiguredBackend;

    fn doc(source: &str) -> RetrievedDocument {
        RetrievedDocument::new(format!("content of {}", source), source)
    }

    fn backend(retriever: MockRetriever, model: Arc<MockClient>) -> ConfiguredBackend {
        ConfiguredBackend::new(BackendSelection::BedrockClaudev2, Arc::new(retriever), model)
    }

    // ---- dedup ----

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let docs = ["A", "B", "A", "C", "B"].iter().map(|s| doc(s)).collect();
        let ids: Vec<String> = dedup_by_source(docs).into_iter().map(|d| d.source_id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dedup_empty() {
        assert!(dedup_by_source(Vec::new()).is_empty());
    }

    // ---- answer ----

    #[tokio::test]
    async fn test_end_to_end_follow_up() {
        let model = Arc::new(MockClient::new(vec![
            MockReply::text("What is oncology?"),
            MockReply::text("Based on the information provided from some trusted sources.. oncology is the study of cancer."),
        ]));
        let retriever = MockRetriever::new(vec![doc("doc1"), doc("doc2")]);
        let backend = backend(retriever, model.clone());

        let mut history = HistoryBuffer::default();
        history.append(Turn::new("What is radiology?", "Radiology is medical imaging."));

        let result = ConversationOrchestrator::new()
            .answer(&backend, "And oncology?", &mut history)
            .await
            .unwrap();

        assert!(result.answer_text.contains("Based on the information provided"));
        assert_eq!(result.source_ids(), vec!["doc1", "doc2"]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.as_sequence()[1].question, "And oncology?");

        // The grounded prompt carries the rewritten question and both documents.
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("provide a detailed answer for, What is oncology?"));
        assert!(prompts[1].contains("content of doc1\n\ncontent of doc2"));
    }

    #[tokio::test]
    async fn test_first_question_skips_rewrite() {
        let model = Arc::new(MockClient::new(vec![MockReply::text("A CT scan is imaging.")]));
        let retriever = Arc::new(MockRetriever::new(vec![doc("ct")]));
        let backend = ConfiguredBackend::new(BackendSelection::BedrockTitan, retriever.clone(), model.clone());

        let mut history = HistoryBuffer::default();
        ConversationOrchestrator::new()
            .answer(&backend, "What is a CT scan?", &mut history)
            .await
            .unwrap();

        assert_eq!(retriever.queries(), vec!["What is a CT scan?"]);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sources_deduplicated_in_result() {
        let model = Arc::new(MockClient::always("answer"));
        let retriever = MockRetriever::new(vec![doc("A"), doc("B"), doc("A"), doc("C"), doc("B")]);
        let backend = backend(retriever, model);

        let mut history = HistoryBuffer::default();
        let result = ConversationOrchestrator::new()
            .answer(&backend, "q", &mut history)
            .await
            .unwrap();
        assert_eq!(result.source_ids(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_generator_failure_leaves_history_untouched() {
        let model = Arc::new(MockClient::new(vec![
            MockReply::text("standalone"),
            MockReply::Error(LlmError::ModelInvocation("ValidationException".into())),
        ]));
        let backend = backend(MockRetriever::new(vec![doc("doc1")]), model);

        let mut history = HistoryBuffer::default();
        history.append(Turn::new("q1", "a1"));
        let before = history.clone();

        let err = ConversationOrchestrator::new()
            .answer(&backend, "q2", &mut history)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ModelInvocation(_)));
        assert_eq!(history, before);
    }

    #[tokio::test]
    async fn test_retrieval_failure_leaves_history_untouched() {
        let model = Arc::new(MockClient::always("unused"));
        let backend = backend(
            MockRetriever::failing(RetrievalError::Authentication("expired".into())),
            model.clone(),
        );

        let mut history = HistoryBuffer::default();
        let err = ConversationOrchestrator::new()
            .answer(&backend, "q", &mut history)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Authentication(_)));
        assert!(history.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_answers() {
        let model = Arc::new(MockClient::always("don't know"));
        let backend = backend(MockRetriever::new(vec![]), model.clone());

        let mut history = HistoryBuffer::default();
        let result = ConversationOrchestrator::new()
            .answer(&backend, "q", &mut history)
            .await
            .unwrap();
        assert!(result.source_documents.is_empty());
        assert!(model.prompts()[0].contains("<documents>\n\n</documents>"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieval_timeout_aborts_turn() {
        struct SlowRetriever;

        #[async_trait::async_trait]
        impl medchat_retrieval::Retriever for SlowRetriever {
            fn name(&self) -> &str {
                "slow"
            }

            async fn retrieve(
                &self,
                _query: &str,
                _top_k: usize,
            ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }

        let backend = ConfiguredBackend::new(
            BackendSelection::Llama2,
            Arc::new(SlowRetriever),
            Arc::new(MockClient::always("unused")),
        )
        .with_retrieval_timeout(Duration::from_secs(2));

        let mut history = HistoryBuffer::default();
        let err = ConversationOrchestrator::new()
            .answer(&backend, "q", &mut history)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout { stage: "retrieval", .. }));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_capped_over_many_turns() {
        let model = Arc::new(MockClient::always("answer"));
        let backend = backend(MockRetriever::new(vec![doc("d")]), model);
        let orchestrator = ConversationOrchestrator::new();

        let mut history = HistoryBuffer::default();
        for i in 1..=6 {
            orchestrator
                .answer(&backend, &format!("Q{}", i), &mut history)
                .await
                .unwrap();
        }
        let questions: Vec<String> = history.iter().map(|t| t.question.clone()).collect();
        assert_eq!(questions, vec!["Q2", "Q3", "Q4", "Q5", "Q6"]);
    }
}
