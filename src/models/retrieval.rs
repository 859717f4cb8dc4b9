//! Structured source attribution returned alongside search results.

use serde::Serialize;

use super::chunk::Metadata;

/// One retrieved chunk traced back to the document it came from.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedSource {
    pub title: String,
    pub chunk: SourceChunk,
    pub document: SourceDocument,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    pub uri: String,
    pub content: String,
    pub pages: Option<Vec<i64>>,
    /// Rank score: strictly descending by result order.
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
    pub link: Option<String>,
}
