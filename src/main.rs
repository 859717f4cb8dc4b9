use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chunkmill::cli::commands::{
    handle_add, handle_content, handle_delete, handle_process, handle_search, handle_stats,
    handle_types, handle_worker,
};
use chunkmill::cli::{Cli, Commands};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // logs go to stderr; stdout belongs to command output and the worker's
    // result channel
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    match cli.command {
        // the isolated worker is synchronous and must not inherit a runtime
        Commands::Worker(args) => handle_worker(args),
        command => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_command(command, verbose)),
    }
}

async fn run_command(command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Process(args) => handle_process(args, verbose).await,
        Commands::Add(args) => handle_add(args, verbose).await,
        Commands::Search(args) => handle_search(args, verbose).await,
        Commands::Content(args) => handle_content(args, verbose).await,
        Commands::Delete(args) => handle_delete(args, verbose).await,
        Commands::Types => handle_types(verbose).await,
        Commands::Stats => handle_stats(verbose).await,
        // dispatched before the runtime starts
        Commands::Worker(_) => Ok(()),
    }
}
