//! Language model clients for medchat.
//!
//! [`LanguageModelClient`] is the seam between the chat pipeline and a
//! hosted model. Bedrock and Llama endpoint clients speak each provider's
//! JSON body format, [`ReliableClient`] adds timeouts and rate-limit
//! retries, and [`MockClient`] serves tests.

pub mod bedrock;
pub mod client;
pub mod error;
pub mod llama;
pub mod mock;
pub mod reliable;

pub use bedrock::{BedrockClient, BedrockModel};
pub use client::{GenerationOptions, LanguageModelClient};
pub use error::LlmError;
pub use llama::LlamaEndpointClient;
pub use mock::{MockClient, MockReply};
pub use reliable::{ReliableClient, RetryPolicy};
