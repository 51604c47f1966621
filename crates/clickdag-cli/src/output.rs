//! Writing generated definitions to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use clickdag_types::{FrameworkConnection, PipelineDefinition};
use serde::Serialize;

/// File the framework connection exports are written to.
pub const CONNECTIONS_FILE: &str = "connections.env";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            Self::Json => {
                serde_json::to_string_pretty(value).context("Failed to render JSON")
            }
            Self::Yaml => serde_yaml::to_string(value).context("Failed to render YAML"),
        }
    }
}

/// Write one `<workflow id>.<ext>` file per pipeline into `dir`, creating
/// it if needed. Returns the written paths in pipeline order.
pub fn write_pipelines(
    dir: &Path,
    pipelines: &[PipelineDefinition],
    format: Format,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    pipelines
        .iter()
        .map(|pipeline| {
            let file_name = format!(
                "{}.{}",
                file_stem(pipeline.workflow_id.as_str()),
                format.extension()
            );
            let path = dir.join(file_name);
            std::fs::write(&path, format.render(pipeline)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

/// `KEY=value` lines exporting each connection to the framework.
pub fn connections_env(connections: &[FrameworkConnection]) -> String {
    connections
        .iter()
        .map(|c| format!("{}={}\n", c.env_var(), c.uri))
        .collect()
}

/// Write [`connections_env`] to `<dir>/connections.env`.
pub fn write_connections(dir: &Path, connections: &[FrameworkConnection]) -> Result<PathBuf> {
    let path = dir.join(CONNECTIONS_FILE);
    std::fs::write(&path, connections_env(connections))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Form-encoded workflow id. Reversible, so distinct ids never share a
/// file, and free of path separators.
fn file_stem(workflow_id: &str) -> String {
    url::form_urlencoded::byte_serialize(workflow_id.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clickdag_engine::{GeneratorSettings, PipelineBuilder};
    use clickdag_types::WorkflowConfig;

    fn pipelines() -> Vec<PipelineDefinition> {
        let settings = GeneratorSettings::new("mongodb://localhost/astro", "batch-job:2.1");
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let builder = PipelineBuilder::new(&settings, now);
        ["wf-1", "wf/2"]
            .into_iter()
            .map(|id| builder.build(&WorkflowConfig::new(id)))
            .collect()
    }

    #[test]
    fn writes_one_file_per_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dags");
        let written = write_pipelines(&out, &pipelines(), Format::Json).unwrap();

        assert_eq!(written, vec![out.join("wf-1.json"), out.join("wf%2F2.json")]);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        let back: PipelineDefinition = serde_json::from_str(&text).unwrap();
        assert_eq!(back.workflow_id.as_str(), "wf-1");
        assert_eq!(back.tasks.len(), 1 + 2 + 10);
    }

    #[test]
    fn similar_ids_get_distinct_files() {
        let settings = GeneratorSettings::new("mongodb://localhost/astro", "batch-job:2.1");
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let builder = PipelineBuilder::new(&settings, now);
        let pipelines: Vec<_> = ["acct/1", "acct_1", "acct 1", "acct+1"]
            .into_iter()
            .map(|id| builder.build(&WorkflowConfig::new(id)))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let written = write_pipelines(dir.path(), &pipelines, Format::Json).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
        for (path, pipeline) in written.iter().zip(&pipelines) {
            let back: PipelineDefinition =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(back.workflow_id, pipeline.workflow_id);
        }
    }

    #[test]
    fn yaml_files_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_pipelines(dir.path(), &pipelines()[..1], Format::Yaml).unwrap();
        assert_eq!(written[0].extension().unwrap(), "yaml");
        let text = std::fs::read_to_string(&written[0]).unwrap();
        let back: PipelineDefinition = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.name, "test_astronomer_clickstream_to_redshift__etl__wf-1");
    }

    #[test]
    fn connections_file_holds_export_lines() {
        let dir = tempfile::tempdir().unwrap();
        let conn = FrameworkConnection::object_store("S3_CONNECTION", "AKIA", "se/cret");
        let path = write_connections(dir.path(), &[conn]).unwrap();
        assert_eq!(path.file_name().unwrap(), CONNECTIONS_FILE);
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "AIRFLOW_CONN_S3_CONNECTION=s3://AKIA:se%2Fcret@S3\n"
        );
    }

    #[test]
    fn empty_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_pipelines(dir.path(), &[], Format::Json).unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
