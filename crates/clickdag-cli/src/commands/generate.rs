use std::path::Path;

use anyhow::{Context, Result};
use clickdag_store::ConfigCollection;

use crate::output::{self, Format};

/// Execute the `generate` command: build and emit every pipeline definition.
pub async fn execute(
    config: Option<&Path>,
    source: ConfigCollection,
    output_dir: Option<&Path>,
    format: Format,
    emit_connections: bool,
) -> Result<()> {
    let settings = super::load_settings(config)?;

    let generated = clickdag_engine::generate(&settings, source)
        .await
        .context("Pipeline generation failed")?;

    let Some(dir) = output_dir else {
        let rendered = if emit_connections {
            format.render(&generated)?
        } else {
            format.render(&generated.pipelines)?
        };
        println!("{rendered}");
        return Ok(());
    };

    let written = output::write_pipelines(dir, &generated.pipelines, format)?;
    for path in &written {
        tracing::info!(path = %path.display(), "Wrote pipeline definition");
    }
    if emit_connections {
        let path = output::write_connections(dir, &generated.connections)?;
        tracing::info!(path = %path.display(), "Wrote connection exports");
    }

    println!(
        "Generated {} pipeline(s) into {}",
        written.len(),
        dir.display()
    );
    Ok(())
}
