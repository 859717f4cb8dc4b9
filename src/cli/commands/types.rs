use anyhow::Result;

use crate::formats::FormatRegistry;
use crate::models::Config;

pub async fn handle_types(_verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let registry = FormatRegistry::from_config(&config)?;

    for extension in registry.extensions() {
        println!("{extension}");
    }
    Ok(())
}
