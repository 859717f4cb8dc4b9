//! Vector store abstraction layer.
//!
//! A uniform contract over interchangeable backends (Qdrant,
//! PostgreSQL/pgvector, dev-null). Adapters own an [`Embedder`] and embed
//! document batches and queries themselves, so callers only deal in chunks.

mod devnull;
mod pgvector;
mod qdrant;

pub use devnull::DevNullBackend;
pub use pgvector::PgVectorBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{Chunk, Config, StoreDriver, validate_collection_name};
use crate::services::embedder::Embedder;

/// Bucket/doc-id restriction applied to similarity search.
///
/// `doc_ids: Some(vec![])` means "match nothing", which is distinct from
/// `None` ("no restriction").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilter {
    pub bucket: Option<String>,
    pub doc_ids: Option<Vec<String>>,
}

impl StoreFilter {
    /// True when the filter can never match anything. Backends short-circuit
    /// to an empty result without being contacted; some would otherwise read
    /// an empty id list as "no restriction".
    pub fn matches_nothing(&self) -> bool {
        matches!(self.doc_ids, Some(ref ids) if ids.is_empty())
    }
}

/// Abstract contract all vector store backends implement.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks with their embeddings.
    async fn add_documents(&self, chunks: Vec<Chunk>) -> Result<(), StoreError>;

    /// Delete every chunk whose `doc_id` metadata matches. Deleting an
    /// unknown id is not an error.
    async fn delete(&self, doc_id: &str) -> Result<(), StoreError>;

    /// Search for chunks similar to the query, optionally restricted by a
    /// filter.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<Chunk>, StoreError>;

    /// Fetch chunks by their store-assigned ids.
    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>, StoreError>;

    /// The collection/table name this adapter writes to.
    fn collection(&self) -> &str;
}

/// Serializes lazy collection/table creation within this process.
///
/// Concurrent workers may race to create the same named collection on first
/// use; this lock prevents duplicate creation inside one process. It says
/// nothing about cross-process races; those lean on the backends being
/// idempotent on creation.
pub(crate) static COLLECTION_CREATION_LOCK: Mutex<()> = Mutex::const_new(());

/// Create the configured backend, overriding the collection name when the
/// caller supplies one.
pub async fn create_store(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    collection: Option<&str>,
) -> Result<Box<dyn VectorStore>, StoreError> {
    let collection = match collection {
        Some(name) => {
            validate_collection_name(name)
                .map_err(|e| StoreError::InvalidCollectionName(e.to_string()))?;
            name.to_string()
        }
        None => config.store.collection.clone(),
    };

    match config.store.driver {
        StoreDriver::Qdrant => {
            let backend = QdrantBackend::new(&config.store, embedder, collection).await?;
            Ok(Box::new(backend))
        }
        StoreDriver::PgVector => {
            let backend = PgVectorBackend::new(&config.store, embedder, collection).await?;
            Ok(Box::new(backend))
        }
        StoreDriver::DevNull => Ok(Box::new(DevNullBackend::new(collection))),
    }
}
