use std::sync::Arc;
use std::time::Duration;

use pgvector::Vector;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use super::{COLLECTION_CREATION_LOCK, StoreFilter, VectorStore};
use crate::error::StoreError;
use crate::models::{Chunk, Metadata, StoreConfig};
use crate::services::embedder::Embedder;

pub struct PgVectorBackend {
    pool: PgPool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl PgVectorBackend {
    pub async fn new(
        config: &StoreConfig,
        embedder: Arc<dyn Embedder>,
        collection: String,
    ) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or_else(|| {
            StoreError::ConnectionError("pgvector store requires a connection url".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            pool,
            collection,
            embedder,
        };

        backend.check_pgvector_extension().await?;
        backend.ensure_table().await?;
        Ok(backend)
    }

    async fn check_pgvector_extension(&self) -> Result<(), StoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        if result.is_none() {
            return Err(StoreError::CollectionError(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the chunk table and its indices on first use.
    ///
    /// Guarded by the process-wide creation lock; the statements themselves
    /// are `IF NOT EXISTS`, which keeps creation idempotent across
    /// processes. The embedding backend sizes the vector column.
    async fn ensure_table(&self) -> Result<(), StoreError> {
        let _guard = COLLECTION_CREATION_LOCK.lock().await;

        let dimension = self.embedder.embed_query("Text").await?.len();

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                doc_id TEXT,
                bucket TEXT,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                embedding vector({}) NOT NULL
            )
            "#,
            self.collection, dimension
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::CollectionError(e.to_string()))?;

        let indices = [
            format!(
                "CREATE INDEX IF NOT EXISTS {}_embedding_idx ON {} USING hnsw (embedding vector_cosine_ops)",
                self.collection, self.collection
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {}_doc_id_idx ON {} (doc_id)",
                self.collection, self.collection
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {}_bucket_idx ON {} (bucket)",
                self.collection, self.collection
            ),
        ];
        for index_sql in &indices {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::CollectionError(e.to_string()))?;
        }

        Ok(())
    }
}

fn chunk_from_row(row: &PgRow) -> Chunk {
    let id: String = row.get("id");
    let content: String = row.get("content");
    let metadata_value: serde_json::Value = row.get("metadata");

    let mut metadata: Metadata = match metadata_value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    };
    metadata.insert("id".to_string(), id.into());
    Chunk::with_metadata(content, metadata)
}

#[async_trait::async_trait]
impl VectorStore for PgVectorBackend {
    async fn add_documents(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(texts).await?;

        let query = format!(
            "INSERT INTO {} (id, doc_id, bucket, content, metadata, embedding)
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.collection
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::UpsertError(e.to_string()))?;

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let embedding = Vector::from(embedding);
            let doc_id = chunk.meta_str("doc_id").map(|s| s.to_string());
            let bucket = chunk.meta_str("bucket").map(|s| s.to_string());
            let metadata = serde_json::Value::Object(chunk.metadata.clone());

            sqlx::query(&query)
                .bind(uuid::Uuid::new_v4())
                .bind(doc_id)
                .bind(bucket)
                .bind(&chunk.content)
                .bind(&metadata)
                .bind(&embedding)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::UpsertError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), StoreError> {
        let query = format!("DELETE FROM {} WHERE doc_id = $1", self.collection);
        sqlx::query(&query)
            .bind(doc_id)
            .execute(&self.pool)
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

        let embedding = Vector::from(self.embedder.embed_query(query).await?);

        let mut where_parts = Vec::new();
        let mut param_index = 2;
        let bucket = filter.and_then(|f| f.bucket.as_deref());
        let doc_ids = filter.and_then(|f| f.doc_ids.as_deref());

        if bucket.is_some() {
            where_parts.push(format!("bucket = ${param_index}"));
            param_index += 1;
        }
        if doc_ids.is_some() {
            where_parts.push(format!("doc_id = ANY(${param_index})"));
        }

        let where_clause = if where_parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_parts.join(" AND "))
        };

        let sql = format!(
            "SELECT id::text as id, content, metadata
             FROM {} {} ORDER BY embedding <=> $1 LIMIT {}",
            self.collection, where_clause, k
        );

        let mut query_builder = sqlx::query(&sql).bind(&embedding);
        if let Some(bucket) = bucket {
            query_builder = query_builder.bind(bucket.to_string());
        }
        if let Some(doc_ids) = doc_ids {
            query_builder = query_builder.bind(doc_ids.to_vec());
        }

        let rows = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        Ok(rows.iter().map(chunk_from_row).collect())
    }

    async fn get_documents(&self, ids: &[String]) -> Result<Vec<Chunk>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut uuids = Vec::with_capacity(ids.len());
        for id in ids {
            let parsed = uuid::Uuid::parse_str(id)
                .map_err(|e| StoreError::SearchError(format!("invalid chunk id `{id}`: {e}")))?;
            uuids.push(parsed);
        }

        let sql = format!(
            "SELECT id::text as id, content, metadata FROM {} WHERE id = ANY($1)",
            self.collection
        );

        let rows = sqlx::query(&sql)
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        Ok(rows.iter().map(chunk_from_row).collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
