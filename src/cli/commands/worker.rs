//! Isolated parse worker entry point.
//!
//! Spawned by the execution isolation strategy. Rebuilds the provider from
//! configuration (providers are stateless per configuration), parses the
//! file, and writes exactly one tagged result to stdout. Logging goes to
//! stderr so stdout stays a clean one-shot channel.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::error::PipelineError;
use crate::formats::FormatRegistry;
use crate::models::{Chunk, ChunkOptions, Config, SourceFile};
use crate::services::isolation::{WorkerFailure, WorkerResult};

#[derive(Debug, Args)]
pub struct WorkerArgs {
    #[arg(long)]
    pub provider: String,

    #[arg(long)]
    pub file_id: String,

    #[arg(long)]
    pub path: PathBuf,

    #[arg(long)]
    pub file_name: String,

    #[arg(long)]
    pub mime_type: String,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub chunk_overlap: Option<usize>,
}

/// Runs synchronously, without an async runtime.
pub fn handle_worker(args: WorkerArgs) -> Result<()> {
    let message = match run(args) {
        Ok(chunks) => WorkerResult::Ok(chunks),
        Err(ref e) => WorkerResult::Err(WorkerFailure::from_error(e)),
    };
    println!("{}", serde_json::to_string(&message)?);
    Ok(())
}

fn run(args: WorkerArgs) -> Result<Vec<Chunk>, PipelineError> {
    let config = Config::load()
        .map_err(|e| PipelineError::Worker(format!("worker configuration failed: {e}")))?;
    let registry = FormatRegistry::from_config(&config)
        .map_err(|e| PipelineError::Worker(format!("worker registry failed: {e}")))?;

    let provider = registry.by_name(&args.provider).ok_or_else(|| {
        PipelineError::Worker(format!("unknown format provider `{}`", args.provider))
    })?;

    // the parent owns the source file; never delete it here
    let file = SourceFile::new(args.file_id, args.path, args.mime_type, args.file_name);
    let opts = ChunkOptions {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
    };

    Ok(provider.process_file(&file, &opts)?)
}
