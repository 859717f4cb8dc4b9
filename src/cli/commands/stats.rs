use anyhow::Result;

use super::open_metrics;
use crate::cli::output::{note, print_json};
use crate::models::Config;

pub async fn handle_stats(_verbose: bool) -> Result<()> {
    let config = Config::load()?;

    match open_metrics(&config)? {
        Some(metrics) => {
            let summary = metrics.get_summary(30);
            print_json(&summary)?;
        }
        None => note("metrics are not configured (set metrics.path)"),
    }
    Ok(())
}
