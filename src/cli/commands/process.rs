use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use super::{open_metrics, persist_input};
use crate::cli::output::{note, print_json};
use crate::formats::FormatRegistry;
use crate::models::{ChunkOptions, Config};
use crate::services::pipeline;

#[derive(Debug, Args)]
pub struct ProcessArgs {
    #[arg(help = "File to process")]
    pub file: PathBuf,

    #[arg(long, help = "Override the file name used for format dispatch")]
    pub file_name: Option<String>,

    #[arg(long, help = "MIME type recorded in chunk metadata")]
    pub mime_type: Option<String>,

    #[arg(long, help = "Chunk size override")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Chunk overlap override")]
    pub chunk_overlap: Option<usize>,
}

pub async fn handle_process(args: ProcessArgs, verbose: bool) -> Result<()> {
    let config = Arc::new(Config::load()?);
    let registry = Arc::new(FormatRegistry::from_config(&config)?);
    let metrics = open_metrics(&config)?;

    let file = persist_input(&args.file, args.file_name, args.mime_type)?;
    let opts = ChunkOptions {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
    };

    if verbose {
        note(&format!("staged as {}", file.path.display()));
    }

    let join = {
        let config = config.clone();
        let registry = registry.clone();
        let file = file.clone();
        tokio::task::spawn_blocking(move || {
            pipeline::process_file(&config, &registry, metrics.as_ref(), &file, &opts)
        })
        .await
    };
    // the staged copy is released on every exit path
    file.delete_quiet();

    let chunks = join.context("parse task failed")??;
    print_json(&chunks)?;
    Ok(())
}
