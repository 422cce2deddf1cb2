//! Document retrieval for medchat.
//!
//! A [`Retriever`] turns a standalone question into a ranked list of
//! supporting documents. The remote index retriever talks to a ranked
//! retrieval service over HTTP; the corpus retriever ranks the local canned
//! documents by keyword overlap; the mock retriever serves tests.

pub mod corpus;
pub mod error;
pub mod kendra;
pub mod mock;
pub mod retriever;

pub use corpus::CorpusRetriever;
pub use error::RetrievalError;
pub use kendra::KendraRetriever;
pub use mock::MockRetriever;
pub use retriever::Retriever;
