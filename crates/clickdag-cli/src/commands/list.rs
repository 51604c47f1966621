use std::path::Path;

use anyhow::Result;
use clickdag_store::ConfigCollection;

/// Execute the `list` command: one line per stored workflow.
pub async fn execute(config: Option<&Path>, source: ConfigCollection) -> Result<()> {
    let settings = super::load_settings(config)?;
    let store = super::connect(&settings).await?;

    let summaries = clickdag_engine::list_workflows(&store, source, &settings).await?;

    if summaries.is_empty() {
        println!("No workflows with activities in {source}.");
        return Ok(());
    }

    for summary in &summaries {
        println!("  {}", summary.pipeline_name);
        println!(
            "    workflow: {}  activities: {}",
            summary.id, summary.activities
        );
        println!("    immediate: {}", summary.immediate_tables.join(", "));
        if summary.delayed_tables.is_empty() {
            println!("    delayed:   (none)");
        } else {
            println!("    delayed:   {}", summary.delayed_tables.join(", "));
        }
    }
    Ok(())
}
