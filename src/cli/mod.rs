//! CLI for the ingestion pipeline.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Document ingestion pipeline: chunk files, store and search them.
#[derive(Debug, Parser)]
#[command(name = "chunkmill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process a file into chunks and print them
    Process(commands::ProcessArgs),

    /// Process a file and store its chunks in the vector store
    Add(commands::AddArgs),

    /// Search stored chunks
    Search(commands::SearchArgs),

    /// Fetch chunk contents by their ids
    Content(commands::ContentArgs),

    /// Delete all stored chunks of a document
    Delete(commands::DeleteArgs),

    /// List the file extensions the enabled providers support
    Types,

    /// Show ingestion metrics
    Stats,

    /// Isolated parse worker (spawned internally)
    #[command(hide = true)]
    Worker(commands::WorkerArgs),
}
