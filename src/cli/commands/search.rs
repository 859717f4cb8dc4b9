use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::print_json;
use crate::formats::FormatRegistry;
use crate::models::{Chunk, Config, RetrievedSource};
use crate::services::attribution;
use crate::services::embedder::create_embedder;
use crate::services::pipeline;
use crate::services::store::create_store;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'n', default_value_t = 4, help = "Number of results")]
    pub take: usize,

    #[arg(long, help = "Restrict to one bucket")]
    pub bucket: Option<String>,

    #[arg(
        long,
        help = "Comma separated doc ids to restrict the search; an empty list matches nothing"
    )]
    pub files: Option<String>,

    #[arg(long, help = "Target collection instead of the configured one")]
    pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    chunks: Vec<Chunk>,
    debug: String,
    sources: Vec<RetrievedSource>,
}

pub async fn handle_search(args: SearchArgs, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let registry = FormatRegistry::from_config(&config)?;

    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config, embedder, args.collection.as_deref()).await?;

    // "--files a,b" restricts, "--files ''" matches nothing, absent means
    // no restriction
    let doc_ids = args.files.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    let chunks = pipeline::search(
        &registry,
        store.as_ref(),
        &args.query,
        args.bucket,
        args.take,
        doc_ids,
    )
    .await?;

    let output = SearchOutput {
        debug: attribution::sources_markdown(&chunks),
        sources: attribution::file_sources(&chunks),
        chunks,
    };
    print_json(&output)?;
    Ok(())
}
