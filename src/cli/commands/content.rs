use anyhow::Result;
use clap::Args;

use crate::cli::output::print_json;
use crate::models::Config;
use crate::services::embedder::create_embedder;
use crate::services::pipeline;
use crate::services::store::create_store;

#[derive(Debug, Args)]
pub struct ContentArgs {
    #[arg(required = true, help = "Chunk ids to fetch")]
    pub ids: Vec<String>,

    #[arg(long, help = "Target collection instead of the configured one")]
    pub collection: Option<String>,
}

pub async fn handle_content(args: ContentArgs, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config, embedder, args.collection.as_deref()).await?;

    let content = pipeline::get_documents_content(store.as_ref(), &args.ids).await?;
    print_json(&content)?;
    Ok(())
}
