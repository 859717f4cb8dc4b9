//! Chunking & batching engine.
//!
//! Drives one file from raw bytes to metadata-tagged batches: resolve the
//! format provider, run it inline or in an isolated worker, slice the chunk
//! list into batches and merge the shared metadata in. The async operations
//! below compose the engine with the vector store adapters.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::formats::{FormatProvider, FormatRegistry};
use crate::models::{Batch, Chunk, ChunkOptions, Config, SourceFile};
use crate::services::isolation;
use crate::services::metrics::MetricsStore;
use crate::services::store::{StoreFilter, VectorStore};

/// Produce a new chunk record with the engine's shared metadata merged in.
///
/// The reserved keys always come from the engine; provider-supplied keys of
/// the same name are overwritten. Everything else the provider set is kept.
fn merge_metadata(
    chunk: &Chunk,
    format: &str,
    file: &SourceFile,
    doc_id: Option<&str>,
    bucket: Option<&str>,
) -> Chunk {
    let mut metadata = chunk.metadata.clone();
    metadata.insert("format".to_string(), format.into());
    metadata.insert("mime_type".to_string(), file.mime_type.clone().into());
    metadata.insert(
        "doc_id".to_string(),
        doc_id.map(Value::from).unwrap_or(Value::Null),
    );
    metadata.insert(
        "bucket".to_string(),
        bucket.map(Value::from).unwrap_or(Value::Null),
    );
    metadata.insert("source".to_string(), file.file_name.clone().into());
    Chunk::with_metadata(chunk.content.clone(), metadata)
}

/// Obtain the provider's chunk list, inline or through the isolation
/// strategy.
fn run_provider(
    provider: &dyn FormatProvider,
    file: &SourceFile,
    opts: &ChunkOptions,
    threshold: u64,
) -> Result<Vec<Chunk>, PipelineError> {
    if provider.multiprocessable() && file.size()? >= threshold {
        isolation::run_in_worker(provider.name(), file, opts)
    } else {
        Ok(provider.process_file(file, opts)?)
    }
}

/// Drive one file to zero-or-more metadata-tagged batches.
///
/// An empty chunk list (e.g. an empty document) yields zero batches and is
/// not an error; a file no provider claims is.
pub fn generate_batches(
    config: &Config,
    registry: &FormatRegistry,
    file: &SourceFile,
    bucket: Option<&str>,
    doc_id: Option<&str>,
    opts: &ChunkOptions,
) -> Result<Vec<Batch>, PipelineError> {
    let provider = registry
        .resolve(file)
        .ok_or(PipelineError::UnsupportedFormat)?;

    let chunks =
        run_provider(provider, file, opts, config.indexing.filesize_threshold).map_err(|e| {
            warn!("failed processing file `{}`: {e}", file.id);
            e
        })?;

    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = config.indexing.batch_size.unwrap_or(chunks.len());
    let num_batches = chunks.len().div_ceil(batch_size);

    Ok(chunks
        .chunks(batch_size)
        .enumerate()
        .map(|(index, group)| Batch {
            chunks: group
                .iter()
                .map(|chunk| merge_metadata(chunk, provider.name(), file, doc_id, bucket))
                .collect(),
            index,
            total: num_batches,
        })
        .collect())
}

/// Process a file and return its chunks without storing them.
pub fn process_file(
    config: &Config,
    registry: &FormatRegistry,
    metrics: Option<&MetricsStore>,
    file: &SourceFile,
    opts: &ChunkOptions,
) -> Result<Vec<Chunk>, PipelineError> {
    info!("processing file: {}", file.id);
    let started = Instant::now();

    let result = generate_batches(config, registry, file, None, Some(&file.id), opts);
    if let Some(metrics) = metrics {
        metrics.record(started.elapsed().as_millis() as u64, result.is_ok());
    }

    let chunks: Vec<Chunk> = result?.into_iter().flat_map(|batch| batch.chunks).collect();
    info!("completed file: {}", file.id);
    Ok(chunks)
}

/// Process a file and write its batches to the vector store, in order.
pub async fn add_file(
    config: Arc<Config>,
    registry: Arc<FormatRegistry>,
    store: &dyn VectorStore,
    metrics: Option<&MetricsStore>,
    file: &SourceFile,
    bucket: String,
    opts: ChunkOptions,
) -> Result<(), PipelineError> {
    info!("processing and adding file: {}", file.id);
    let started = Instant::now();

    let result = {
        let config = config.clone();
        let registry = registry.clone();
        let file = file.clone();
        let bucket = bucket.clone();
        // parsing is blocking work; keep it off the async surface
        tokio::task::spawn_blocking(move || {
            let doc_id = file.id.clone();
            generate_batches(&config, &registry, &file, Some(&bucket), Some(&doc_id), &opts)
        })
        .await
        .map_err(|e| PipelineError::Worker(format!("parse task failed: {e}")))?
    };

    let write_result: Result<(), PipelineError> = async {
        for batch in result? {
            info!(
                "add {} chunks for doc_id {}: ({}/{})",
                batch.chunks.len(),
                file.id,
                batch.index + 1,
                batch.total
            );
            let count = batch.chunks.len();
            store.add_documents(batch.chunks).await?;
            info!(
                "ready with {} chunks for doc_id {}: ({}/{})",
                count,
                file.id,
                batch.index + 1,
                batch.total
            );
        }
        Ok(())
    }
    .await;

    if let Some(metrics) = metrics {
        metrics.record(started.elapsed().as_millis() as u64, write_result.is_ok());
    }
    if write_result.is_ok() {
        info!("completed file: {}", file.id);
    }
    write_result
}

/// Similarity search with the providers' post-retrieval clean-up applied and
/// the bucket key stripped before chunks go back to the caller.
pub async fn search(
    registry: &FormatRegistry,
    store: &dyn VectorStore,
    query: &str,
    bucket: Option<String>,
    take: usize,
    doc_ids: Option<Vec<String>>,
) -> Result<Vec<Chunk>, PipelineError> {
    let filter = StoreFilter { bucket, doc_ids };

    info!("start similarity search");
    let docs = store.similarity_search(query, take, Some(&filter)).await?;

    let mut result = Vec::with_capacity(docs.len());
    for doc in docs {
        let format = doc.meta_str("format").map(str::to_string);
        let mut cleaned = match format.as_deref().and_then(|name| registry.by_name(name)) {
            Some(provider) => provider.clean_up(doc),
            None => doc,
        };
        cleaned.metadata.remove("bucket");
        result.push(cleaned);
    }
    Ok(result)
}

/// Fetch chunk contents by id. PDF chunks come back in page order.
pub async fn get_documents_content(
    store: &dyn VectorStore,
    ids: &[String],
) -> Result<Vec<String>, PipelineError> {
    let mut docs = store.get_documents(ids).await?;

    if docs
        .first()
        .is_some_and(|doc| doc.meta_str("format") == Some("pdf"))
    {
        docs.sort_by_key(|doc| doc.meta_i64("page").unwrap_or(i64::MAX));
    }

    Ok(docs.into_iter().map(|doc| doc.content).collect())
}

/// Delete every chunk belonging to the document.
pub async fn delete_file(store: &dyn VectorStore, doc_id: &str) -> Result<(), PipelineError> {
    info!("delete chunks with doc_id '{doc_id}'");
    store.delete(doc_id).await?;
    Ok(())
}
