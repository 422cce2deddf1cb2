//! Canned question documents loaded from disk at startup.
//!
//! Each file in the docs directory becomes one document. Files are ordered
//! by name and their whitespace is normalized once, at load time.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MedchatError, Result};

/// Placeholder that survives the single-newline pass.
const PARAGRAPH_SENTINEL: &str = "$%$";

/// One normalized document from the corpus directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusDocument {
    /// File name, used as the source id by the local retriever.
    pub name: String,
    pub text: String,
}

/// Ordered, read-only set of corpus documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<CorpusDocument>,
}

impl Corpus {
    /// Read every regular file in `dir`, sorted by file name.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            MedchatError::Corpus(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = std::fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            debug!(name = %name, bytes = raw.len(), "Corpus document read");
            documents.push(CorpusDocument {
                name,
                text: normalize_ws(raw.trim()),
            });
        }

        info!(dir = %dir.display(), count = documents.len(), "Corpus loaded");
        Ok(Self { documents })
    }

    /// Build a corpus from already-normalized documents.
    pub fn from_documents(documents: Vec<CorpusDocument>) -> Self {
        Self { documents }
    }

    pub fn get(&self, index: usize) -> Option<&CorpusDocument> {
        self.documents.get(index)
    }

    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Normalize document whitespace.
///
/// Paired newlines are kept as paragraph breaks, every remaining newline
/// becomes a space, and runs of spaces collapse to one.
pub fn normalize_ws(doc: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(" +").expect("static regex"));

    let doc = doc
        .replace("\n\n", PARAGRAPH_SENTINEL)
        .replace('\n', " ")
        .replace(PARAGRAPH_SENTINEL, "\n\n");
    spaces.replace_all(&doc, " ").into_owned()
}
