use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::{open_metrics, persist_input};
use crate::cli::output::success;
use crate::formats::FormatRegistry;
use crate::models::{ChunkOptions, Config};
use crate::services::embedder::create_embedder;
use crate::services::pipeline;
use crate::services::store::create_store;

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(help = "File to ingest")]
    pub file: PathBuf,

    #[arg(long, help = "Bucket the chunks belong to")]
    pub bucket: String,

    #[arg(long, help = "Document id; defaults to a generated one")]
    pub doc_id: Option<String>,

    #[arg(long, help = "Override the file name used for format dispatch")]
    pub file_name: Option<String>,

    #[arg(long, help = "MIME type recorded in chunk metadata")]
    pub mime_type: Option<String>,

    #[arg(long, help = "Target collection instead of the configured one")]
    pub collection: Option<String>,
}

pub async fn handle_add(args: AddArgs, _verbose: bool) -> Result<()> {
    let config = Arc::new(Config::load()?);
    let registry = Arc::new(FormatRegistry::from_config(&config)?);
    let metrics = open_metrics(&config)?;

    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config, embedder, args.collection.as_deref()).await?;

    let mut file = persist_input(&args.file, args.file_name, args.mime_type)?;
    if let Some(doc_id) = args.doc_id {
        file.id = doc_id;
    }
    let doc_id = file.id.clone();

    let result = pipeline::add_file(
        config,
        registry,
        store.as_ref(),
        metrics.as_ref(),
        &file,
        args.bucket,
        ChunkOptions::default(),
    )
    .await;
    // the staged copy is released on every exit path
    file.delete_quiet();
    result?;

    success(&format!(
        "stored chunks for doc_id {} in collection {}",
        doc_id,
        store.collection()
    ));
    Ok(())
}
