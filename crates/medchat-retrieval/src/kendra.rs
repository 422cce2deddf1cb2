//! Remote ranked-retrieval index client.
//!
//! Issues the index `Retrieve` action over JSON-RPC style HTTP and maps the
//! returned passages to [`RetrievedDocument`]s. Request signing is left to
//! the network layer in front of the endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use medchat_core::types::RetrievedDocument;

use crate::error::RetrievalError;
use crate::retriever::Retriever;

const TARGET_HEADER: &str = "X-Amz-Target";
const RETRIEVE_TARGET: &str = "AWSKendraFrontendService.Retrieve";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// The service rejects query text longer than this.
const MAX_QUERY_CHARS: usize = 999;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveRequest<'a> {
    index_id: &'a str,
    query_text: &'a str,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RetrieveResponse {
    #[serde(default)]
    result_items: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultItem {
    id: Option<String>,
    document_id: Option<String>,
    document_title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(rename = "DocumentURI")]
    document_uri: Option<String>,
}

impl ResultItem {
    fn into_document(self) -> RetrievedDocument {
        let source_id = self
            .document_uri
            .filter(|s| !s.is_empty())
            .or(self.document_id)
            .or(self.id)
            .unwrap_or_default();

        let content = match self.document_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!(
                "Document Title: {}\nDocument Excerpt: \n{}",
                title,
                self.content.trim()
            ),
            _ => self.content.trim().to_string(),
        };

        RetrievedDocument { content, source_id }
    }
}

/// Retriever backed by a remote ranked-retrieval index.
pub struct KendraRetriever {
    client: Client,
    endpoint: String,
    index_id: String,
}

impl KendraRetriever {
    /// Retriever for `index_id` in `region`, using the regional endpoint.
    pub fn new(region: &str, index_id: impl Into<String>) -> Result<Self, RetrievalError> {
        Self::with_endpoint(format!("https://kendra.{}.amazonaws.com", region), index_id)
    }

    /// Retriever for `index_id` behind an explicit endpoint.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        index_id: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RetrievalError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            index_id: index_id.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }
}

/// Trim and cut `query` to the service's length limit on a char boundary.
fn clamp_query(query: &str) -> &str {
    let query = query.trim();
    match query.char_indices().nth(MAX_QUERY_CHARS) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

#[async_trait]
impl Retriever for KendraRetriever {
    fn name(&self) -> &str {
        "kendra"
    }

    #[instrument(skip(self, query), fields(index_id = %self.index_id))]
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let body = RetrieveRequest {
            index_id: &self.index_id,
            query_text: clamp_query(query),
            page_size: top_k,
        };

        let resp = self
            .client
            .post(format!("{}/", self.endpoint))
            .header(TARGET_HEADER, RETRIEVE_TARGET)
            .header("content-type", CONTENT_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RetrievalError::from_status(status, body));
        }

        let parsed: RetrieveResponse = resp
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;

        let documents: Vec<RetrievedDocument> = parsed
            .result_items
            .into_iter()
            .take(top_k)
            .map(ResultItem::into_document)
            .collect();

        debug!(doc_count = documents.len(), "Index retrieval complete");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn retriever_for(server: &MockServer) -> KendraRetriever {
        KendraRetriever::with_endpoint(server.uri(), "idx-123").unwrap()
    }

    #[test]
    fn test_regional_endpoint() {
        let r = KendraRetriever::new("us-east-1", "idx").unwrap();
        assert_eq!(r.endpoint(), "https://kendra.us-east-1.amazonaws.com");
        assert_eq!(r.index_id(), "idx");
    }

    #[test]
    fn test_clamp_query_trims_and_limits() {
        assert_eq!(clamp_query("  what is a CT scan?  "), "what is a CT scan?");
        let long = "é".repeat(1500);
        assert_eq!(clamp_query(&long).chars().count(), MAX_QUERY_CHARS);
    }

    #[test]
    fn test_result_item_prefers_uri_and_prefixes_title() {
        let item = ResultItem {
            id: Some("r1".into()),
            document_id: Some("d1".into()),
            document_title: Some("Radiology".into()),
            content: " Radiology uses imaging. ".into(),
            document_uri: Some("s3://bucket/radiology.pdf".into()),
        };
        let doc = item.into_document();
        assert_eq!(doc.source_id, "s3://bucket/radiology.pdf");
        assert_eq!(
            doc.content,
            "Document Title: Radiology\nDocument Excerpt: \nRadiology uses imaging."
        );
    }

    #[test]
    fn test_result_item_falls_back_to_document_id() {
        let item = ResultItem {
            id: Some("r1".into()),
            document_id: Some("d1".into()),
            document_title: None,
            content: "text".into(),
            document_uri: Some(String::new()),
        };
        let doc = item.into_document();
        assert_eq!(doc.source_id, "d1");
        assert_eq!(doc.content, "text");
    }

    #[tokio::test]
    async fn test_retrieve_success_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header(TARGET_HEADER, RETRIEVE_TARGET))
            .and(body_json(serde_json::json!({
                "IndexId": "idx-123",
                "QueryText": "what is oncology",
                "PageSize": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "QueryId": "q-1",
                "ResultItems": [
                    {"Id": "1", "DocumentId": "d1", "Content": "Oncology is...", "DocumentURI": "doc1"},
                    {"Id": "2", "DocumentId": "d2", "Content": "Cancer care...", "DocumentURI": "doc2"},
                    {"Id": "3", "DocumentId": "d3", "Content": "Extra", "DocumentURI": "doc3"}
                ]
            })))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let docs = retriever.retrieve("  what is oncology ", 2).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source_id, "doc1");
        assert_eq!(docs[0].content, "Oncology is...");
        assert_eq!(docs[1].source_id, "doc2");
    }

    #[tokio::test]
    async fn test_retrieve_empty_result_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "QueryId": "q-2"
            })))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let docs = retriever.retrieve("nothing", 5).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_forbidden_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("expired token"))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let err = retriever.retrieve("q", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Authentication(ref b) if b == "expired token"));
    }

    #[tokio::test]
    async fn test_retrieve_throttled_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let err = retriever.retrieve("q", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_retrieve_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let err = retriever.retrieve("q", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Service { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_retrieve_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let retriever = retriever_for(&server).await;
        let err = retriever.retrieve("q", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidResponse(_)));
    }
}
