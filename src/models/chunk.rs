use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProcessingError;

/// Ordered chunk metadata. Values are scalars or null.
pub type Metadata = serde_json::Map<String, Value>;

/// A content fragment plus metadata, the atomic unit stored and returned.
///
/// Immutable once produced by a format provider; the batching engine derives
/// new records when merging shared metadata in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Builder-style metadata insertion.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_i64(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(Value::as_i64)
    }
}

/// A bounded-size group of chunks forming one store-write unit.
///
/// Flow-control only; never persisted as an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub chunks: Vec<Chunk>,
    pub index: usize,
    pub total: usize,
}

/// Caller overrides for chunk sizing, passed through the pipeline into the
/// format providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkOptions {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

impl ChunkOptions {
    /// Resolve against provider defaults, validating the caller's values.
    pub fn resolve(
        &self,
        default_size: usize,
        default_overlap: usize,
    ) -> Result<(usize, usize), ProcessingError> {
        let chunk_size = self.chunk_size.unwrap_or(default_size);
        if chunk_size == 0 {
            return Err(ProcessingError::invalid("chunk_size needs to be >0"));
        }
        let chunk_overlap = self.chunk_overlap.unwrap_or(default_overlap);
        Ok((chunk_size, chunk_overlap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_metadata_builder() {
        let chunk = Chunk::new("hello").meta("page", 3).meta("source", "a.pdf");
        assert_eq!(chunk.meta_i64("page"), Some(3));
        assert_eq!(chunk.meta_str("source"), Some("a.pdf"));
        assert_eq!(chunk.meta_str("missing"), None);
    }

    #[test]
    fn test_chunk_metadata_preserves_insertion_order() {
        let chunk = Chunk::new("x").meta("b", 1).meta("a", 2).meta("c", json!(null));
        let keys: Vec<&String> = chunk.metadata.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_chunk_options_resolve_defaults() {
        let opts = ChunkOptions::default();
        assert_eq!(opts.resolve(1000, 200).unwrap(), (1000, 200));

        let opts = ChunkOptions {
            chunk_size: Some(500),
            chunk_overlap: Some(0),
        };
        assert_eq!(opts.resolve(1000, 200).unwrap(), (500, 0));
    }

    #[test]
    fn test_chunk_options_rejects_zero_size() {
        let opts = ChunkOptions {
            chunk_size: Some(0),
            chunk_overlap: None,
        };
        assert!(opts.resolve(1000, 200).is_err());
    }
}
