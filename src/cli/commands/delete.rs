use anyhow::Result;
use clap::Args;

use crate::cli::output::success;
use crate::models::Config;
use crate::services::embedder::create_embedder;
use crate::services::pipeline;
use crate::services::store::create_store;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(help = "Document id whose chunks should be removed")]
    pub doc_id: String,

    #[arg(long, help = "Target collection instead of the configured one")]
    pub collection: Option<String>,
}

pub async fn handle_delete(args: DeleteArgs, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config, embedder, args.collection.as_deref()).await?;

    pipeline::delete_file(store.as_ref(), &args.doc_id).await?;
    success(&format!("deleted chunks for doc_id {}", args.doc_id));
    Ok(())
}
