//! Generation runs: read workflows from a store, build their pipelines.
//!
//! Every entry point that reads from a store closes it before returning,
//! whether or not the read succeeded.

use chrono::{DateTime, Utc};
use clickdag_store::{ConfigCollection, ConfigStore, MongoConfigStore};
use clickdag_types::{DocumentId, GenerationOutput, WorkflowConfig};
use serde::Serialize;

use crate::activity::{ActivityPayload, ClickstreamActivity};
use crate::builder::{self, PipelineBuilder, DEFAULT_TABLES};
use crate::config::settings::GeneratorSettings;
use crate::config::validator::{settings_warnings, validate_settings};
use crate::errors::Result;
use crate::naming;

/// Connect to the configured MongoDB store and generate a pipeline for
/// every workflow in `source`.
///
/// # Errors
///
/// Returns [`GenerateError::Settings`](crate::GenerateError::Settings) if the
/// settings are invalid (before any connection is made) and
/// [`GenerateError::Store`](crate::GenerateError::Store) if the store
/// cannot be reached or read.
pub async fn generate(
    settings: &GeneratorSettings,
    source: ConfigCollection,
) -> Result<GenerationOutput> {
    validate_settings(settings)?;
    let store = MongoConfigStore::connect(&settings.store).await?;
    generate_from_store(&store, settings, source, Utc::now()).await
}

/// [`generate`] against an injected store and clock.
///
/// # Errors
///
/// Same as [`generate`]. The store is closed in every case.
pub async fn generate_from_store(
    store: &dyn ConfigStore,
    settings: &GeneratorSettings,
    source: ConfigCollection,
    now: DateTime<Utc>,
) -> Result<GenerationOutput> {
    if let Err(e) = validate_settings(settings) {
        store.close().await;
        return Err(e.into());
    }
    for warning in settings_warnings(settings) {
        tracing::warn!("{warning}");
    }

    let workflows = read_workflows(store, source).await?;
    let builder = PipelineBuilder::new(settings, now);
    let pipelines: Vec<_> = workflows.iter().map(|wf| builder.build(wf)).collect();

    tracing::info!(
        collection = %source,
        pipelines = pipelines.len(),
        "Finished generating pipelines"
    );

    Ok(GenerationOutput {
        pipelines,
        connections: vec![settings.object_store.framework_connection()],
    })
}

/// One stored activity, projected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowActivity {
    pub workflow_id: DocumentId,
    pub valid: bool,
    pub missing: Vec<&'static str>,
    pub payload: ActivityPayload,
}

/// Project every stored activity of every workflow in `source` into a
/// [`ClickstreamActivity`].
///
/// # Errors
///
/// Returns [`GenerateError::Store`](crate::GenerateError::Store) if the
/// store cannot be read.
pub async fn read_activities(
    store: &dyn ConfigStore,
    source: ConfigCollection,
    settings: &GeneratorSettings,
) -> Result<Vec<WorkflowActivity>> {
    let workflows = read_workflows(store, source).await?;
    Ok(workflows
        .iter()
        .flat_map(|wf| {
            wf.activities.iter().map(move |activity| {
                let projected = ClickstreamActivity::from_activity(&wf.id, activity, settings);
                WorkflowActivity {
                    workflow_id: wf.id.clone(),
                    valid: projected.is_valid(),
                    missing: projected.missing_fields(),
                    payload: projected.serialize(),
                }
            })
        })
        .collect())
}

/// What [`generate`] would produce for one workflow, without the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub id: DocumentId,
    pub name: Option<String>,
    pub pipeline_name: String,
    pub immediate_tables: Vec<String>,
    pub delayed_tables: Vec<String>,
    pub activities: usize,
}

/// Summarize every workflow in `source`.
///
/// # Errors
///
/// Returns [`GenerateError::Store`](crate::GenerateError::Store) if the
/// store cannot be read.
pub async fn list_workflows(
    store: &dyn ConfigStore,
    source: ConfigCollection,
    settings: &GeneratorSettings,
) -> Result<Vec<WorkflowSummary>> {
    let workflows = read_workflows(store, source).await?;
    Ok(workflows
        .iter()
        .map(|wf| WorkflowSummary {
            id: wf.id.clone(),
            name: wf.name.clone(),
            pipeline_name: naming::pipeline_name(wf, &settings.defaults.fallback_name),
            immediate_tables: DEFAULT_TABLES.iter().map(|t| (*t).to_string()).collect(),
            delayed_tables: builder::delayed_tables(wf),
            activities: wf.activities.len(),
        })
        .collect())
}

/// Connect, ping and close the configured store.
///
/// # Errors
///
/// Returns [`GenerateError::Store`](crate::GenerateError::Store) if the
/// store cannot be reached.
pub async fn check_store(settings: &GeneratorSettings) -> Result<()> {
    let store = MongoConfigStore::connect(&settings.store).await?;
    let result = store.ping().await;
    store.close().await;
    Ok(result?)
}

async fn read_workflows(
    store: &dyn ConfigStore,
    source: ConfigCollection,
) -> Result<Vec<WorkflowConfig>> {
    tracing::info!(collection = %source, "Querying for workflows");
    let result = store.denormalized(source).await;
    store.close().await;
    let workflows = result?;
    tracing::debug!(collection = %source, count = workflows.len(), "Read workflows");
    Ok(workflows)
}
