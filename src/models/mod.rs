//! Data model: source files, chunks, batches and configuration.

mod chunk;
mod config;
mod retrieval;
mod source_file;

pub use chunk::{Batch, Chunk, ChunkOptions, Metadata};
pub use config::{
    Config, EmbeddingConfig, EmbeddingDriver, IndexingConfig, MetricsConfig, StoreConfig,
    StoreDriver, TranscriptionConfig, validate_collection_name,
};
pub use retrieval::{RetrievedSource, SourceChunk, SourceDocument};
pub use source_file::{SourceFile, TMP_ROOT_ENV};
