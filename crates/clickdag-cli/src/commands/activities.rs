use std::path::Path;

use anyhow::Result;
use clickdag_store::ConfigCollection;

/// Execute the `activities` command: every stored activity as a copy payload.
pub async fn execute(config: Option<&Path>, source: ConfigCollection) -> Result<()> {
    let settings = super::load_settings(config)?;
    let store = super::connect(&settings).await?;

    let activities = clickdag_engine::read_activities(&store, source, &settings).await?;
    let invalid = activities.iter().filter(|a| !a.valid).count();

    println!("{}", serde_json::to_string_pretty(&activities)?);
    if invalid > 0 {
        tracing::warn!(invalid, total = activities.len(), "Some activities are missing parameters");
    }
    Ok(())
}
