use std::path::Path;

use anyhow::Result;
use clickdag_engine::config::validator;

/// Execute the `check` command: validate settings and store connectivity.
pub async fn execute(config: Option<&Path>, offline: bool) -> Result<()> {
    // 1. Load and validate settings
    let settings = super::load_settings(config)?;
    validator::validate_settings(&settings)?;
    println!("Settings:          OK");

    // 2. Report values the jobs will receive as nulls
    for warning in validator::settings_warnings(&settings) {
        println!("  warning: {warning}");
    }

    if offline {
        println!("Config store:      SKIPPED");
        return Ok(());
    }

    // 3. Reach the store
    match clickdag_engine::check_store(&settings).await {
        Ok(()) => {
            println!("Config store:      OK");
            println!("\nAll checks passed.");
            Ok(())
        }
        Err(e) => {
            println!("Config store:      FAILED");
            println!("  {e}");
            anyhow::bail!("One or more checks failed")
        }
    }
}
