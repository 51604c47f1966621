pub mod activities;
pub mod check;
pub mod generate;
pub mod list;

use std::path::Path;

use anyhow::{Context, Result};
use clickdag_engine::config::parser;
use clickdag_engine::GeneratorSettings;
use clickdag_store::MongoConfigStore;

/// Settings from `--config`, or from the environment without one.
fn load_settings(config: Option<&Path>) -> Result<GeneratorSettings> {
    parser::load_settings(config)
}

/// Connect to the store named in `settings`.
async fn connect(settings: &GeneratorSettings) -> Result<MongoConfigStore> {
    anyhow::ensure!(
        !settings.store.url.trim().is_empty(),
        "store.url must be set (MONGO_URL)"
    );
    MongoConfigStore::connect(&settings.store)
        .await
        .context("Failed to connect to config store")
}
