use std::collections::HashMap;
use std::sync::Arc;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder,
    PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};

use super::{COLLECTION_CREATION_LOCK, StoreFilter, VectorStore};
use crate::error::StoreError;
use crate::models::{Chunk, Metadata, StoreConfig};
use crate::services::embedder::Embedder;

pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl QdrantBackend {
    pub async fn new(
        config: &StoreConfig,
        embedder: Arc<dyn Embedder>,
        collection: String,
    ) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(&config.qdrant_url());
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            client,
            collection,
            embedder,
        };
        backend.ensure_collection().await?;
        Ok(backend)
    }

    async fn collection_exists(&self) -> Result<bool, StoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(false)
                } else {
                    Err(StoreError::CollectionError(msg))
                }
            }
        }
    }

    /// Create the collection on first use.
    ///
    /// Guarded by the process-wide creation lock so concurrent workers do
    /// not race to create the same collection. The embedding backend is
    /// consulted once here to size the vector field.
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        let _guard = COLLECTION_CREATION_LOCK.lock().await;

        if self.collection_exists().await? {
            return Ok(());
        }

        let dimension = self.embedder.embed_query("Text").await?.len() as u64;

        let create_collection = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| StoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    /// Bucket restrictions are required matches; doc ids are an any-of set.
    fn build_filter(filter: &StoreFilter) -> Option<Filter> {
        let mut built = Filter::default();
        if let Some(ref bucket) = filter.bucket {
            built
                .must
                .push(Condition::matches("bucket", bucket.clone()));
        }
        if let Some(ref doc_ids) = filter.doc_ids {
            for doc_id in doc_ids {
                built
                    .should
                    .push(Condition::matches("doc_id", doc_id.clone()));
            }
        }
        if built.must.is_empty() && built.should.is_empty() {
            None
        } else {
            Some(built)
        }
    }
}

fn payload_str(
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

fn point_id_string(id: Option<&PointId>) -> String {
    match id {
        Some(id) => match &id.point_id_options {
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid.clone(),
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => num.to_string(),
            None => String::new(),
        },
        None => String::new(),
    }
}

/// Rebuild a chunk from a point payload, exposing the point id as `id`
/// metadata.
fn chunk_from_payload(
    id: String,
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Chunk {
    let content = payload_str(payload, "content").unwrap_or_default();
    let mut metadata: Metadata = payload_str(payload, "metadata")
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    metadata.insert("id".to_string(), id.into());
    Chunk::with_metadata(content, metadata)
}

#[async_trait::async_trait]
impl VectorStore for QdrantBackend {
    async fn add_documents(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(texts).await?;

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
            let raw_metadata = serde_json::to_string(&chunk.metadata)
                .map_err(|e| StoreError::UpsertError(e.to_string()))?;

            // doc_id and bucket are duplicated as top-level payload fields so
            // they stay filterable
            if let Some(doc_id) = chunk.meta_str("doc_id") {
                payload.insert("doc_id".to_string(), doc_id.to_string().into());
            }
            if let Some(bucket) = chunk.meta_str("bucket") {
                payload.insert("bucket".to_string(), bucket.to_string().into());
            }
            payload.insert("content".to_string(), chunk.content.into());
            payload.insert("metadata".to_string(), raw_metadata.into());

            points.push(PointStruct::new(
                uuid::Uuid::new_v4().to_string(),
                embedding,
                payload,
            ));
        }

        let upsert = UpsertPointsBuilder::new(&self.collection, points);
        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| StoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), StoreError> {
        let filter = Filter::must([Condition::matches("doc_id", doc_id.to_string())]);
        let delete = DeletePointsBuilder::new(&self.collection).points(filter);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| StoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<Chunk>, StoreError> {
        // an empty doc-id list can never match; do not bother the backend
        if filter.map(StoreFilter::matches_nothing).unwrap_or(false) {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query).await?;

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query_vector, k as u64).with_payload(true);

        if let Some(built) = filter.and_then(Self::build_filter) {
            search_builder = search_builder.filter(built);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| chunk_from_payload(point_id_string(point.id.as_ref()), &point.payload))
            .collect())
    }

    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(id.clone())).collect();
        let get_points = GetPointsBuilder::new(&self.collection, point_ids).with_payload(true);

        let response = self
            .client
            .get_points(get_points)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| chunk_from_payload(point_id_string(point.id.as_ref()), &point.payload))
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
