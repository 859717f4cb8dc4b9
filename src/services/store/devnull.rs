//! No-op backend: writes are discarded, reads come back empty.

use super::{StoreFilter, VectorStore};
use crate::error::StoreError;
use crate::models::Chunk;

pub struct DevNullBackend {
    collection: String,
}

impl DevNullBackend {
    pub fn new(collection: String) -> Self {
        Self { collection }
    }
}

#[async_trait::async_trait]
impl VectorStore for DevNullBackend {
    async fn add_documents(&self, _chunks: Vec<Chunk>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _doc_id: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn similarity_search(
        &self,
        _query: &str,
        _k: usize,
        _filter: Option<&StoreFilter>,
    ) -> Result<Vec<Chunk>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_documents(&self, _ids: &[String]) -> Result<Vec<Chunk>, StoreError> {
        Ok(Vec::new())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_discarded_and_reads_empty() {
        let store = DevNullBackend::new("index".to_string());

        store
            .add_documents(vec![Chunk::new("hello")])
            .await
            .unwrap();
        // deleting an unknown doc id does not error
        store.delete("missing").await.unwrap();

        let results = store.similarity_search("hello", 4, None).await.unwrap();
        assert!(results.is_empty());
        let docs = store
            .get_documents(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(docs.is_empty());
        assert_eq!(store.collection(), "index");
    }
}
