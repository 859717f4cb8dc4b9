//! Command handlers.

mod add;
mod content;
mod delete;
mod process;
mod search;
mod stats;
mod types;
mod worker;

pub use add::{AddArgs, handle_add};
pub use content::{ContentArgs, handle_content};
pub use delete::{DeleteArgs, handle_delete};
pub use process::{ProcessArgs, handle_process};
pub use search::{SearchArgs, handle_search};
pub use stats::handle_stats;
pub use types::handle_types;
pub use worker::{WorkerArgs, handle_worker};

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{Config, SourceFile};
use crate::services::metrics::MetricsStore;

/// Open the metrics store when one is configured.
pub(crate) fn open_metrics(config: &Config) -> Result<Option<MetricsStore>> {
    match config.metrics.path {
        Some(ref path) => {
            let store = MetricsStore::open(path)
                .with_context(|| format!("failed to open metrics store at {}", path.display()))?;
            Ok(Some(store))
        }
        None => Ok(None),
    }
}

/// Materialize an input file in transient storage, the way a request body
/// would be.
pub(crate) fn persist_input(
    path: &Path,
    file_name: Option<String>,
    mime_type: Option<String>,
) -> Result<SourceFile> {
    let file_name = match file_name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .context("input path has no file name")?,
    };
    let file = SourceFile::persist_from(path, file_name, mime_type.unwrap_or_default())
        .with_context(|| format!("failed to stage {}", path.display()))?;
    Ok(file)
}
