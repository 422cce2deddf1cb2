//! Shared foundation for the medchat workspace.
//!
//! Holds the configuration model, the top-level error type, the data types
//! passed between the retrieval, model and chat crates, and the canned
//! question corpus loader.

pub mod config;
pub mod corpus;
pub mod error;
pub mod types;

pub use config::MedchatConfig;
pub use corpus::{normalize_ws, Corpus, CorpusDocument};
pub use error::{MedchatError, Result};
pub use types::*;
