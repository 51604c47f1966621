//! Generated pipeline definitions.
//!
//! A [`PipelineDefinition`] is plain data: the orchestration framework
//! adapter decides how to register it. Task order is the order tasks were
//! wired, so upstream tasks always precede their dependents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::DocumentId;

/// Everything one generation run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub pipelines: Vec<PipelineDefinition>,
    #[serde(default)]
    pub connections: Vec<FrameworkConnection>,
}

/// One independently scheduled pipeline for a single workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub workflow_id: DocumentId,
    pub schedule_interval: String,
    pub default_args: DefaultArgs,
    pub tasks: Vec<TaskSpec>,
}

impl PipelineDefinition {
    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, task_id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// All container jobs, in wiring order.
    pub fn container_jobs(&self) -> impl Iterator<Item = (&TaskSpec, &ContainerJobSpec)> {
        self.tasks.iter().filter_map(|t| match &t.operator {
            Operator::ContainerJob(job) => Some((t, job)),
            _ => None,
        })
    }

    /// Tasks that list `task_id` as an upstream.
    pub fn downstream_of<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a TaskSpec> {
        self.tasks
            .iter()
            .filter(move |t| t.upstream.iter().any(|u| u == task_id))
    }
}

/// Arguments every task of a pipeline inherits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultArgs {
    pub owner: String,
    pub depends_on_past: bool,
    pub start_date: DateTime<Utc>,
    pub email: Option<String>,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub app_id: DocumentId,
    pub copy_table: Option<String>,
}

/// A node in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_id: String,
    #[serde(default)]
    pub upstream: Vec<String>,
    #[serde(flatten)]
    pub operator: Operator,
}

/// The framework primitive a task maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum Operator {
    /// No-op marker task.
    Marker,
    /// Object-store key sensor.
    KeySensor(KeySensorSpec),
    /// Job run inside the batch-processing container image.
    ContainerJob(ContainerJobSpec),
}

/// Polls the object store for a key under a date partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySensorSpec {
    pub bucket_name: Option<String>,
    pub bucket_key: String,
    /// Partition offset in minutes. Metadata only; the watched key is the
    /// same for every offset.
    pub timedelta: u32,
    pub soft_fail: bool,
    pub poke_interval_secs: u64,
    pub timeout_secs: u64,
}

/// A table copy job run from the batch image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerJobSpec {
    pub name: Option<String>,
    pub version: Option<String>,
    pub pool: Option<String>,
    pub config: CopyJobConfig,
}

/// Parameters the batch image receives for one table copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyJobConfig {
    #[serde(rename = "appId")]
    pub app_id: Option<String>,
    pub table: Option<String>,
    pub redshift_host: Option<String>,
    pub redshift_port: Option<String>,
    pub redshift_db: Option<String>,
    pub redshift_user: Option<String>,
    pub redshift_password: Option<String>,
    pub redshift_schema: Option<String>,
    pub temp_bucket: Option<String>,
    pub timedelta: u32,
}

/// A connection the framework resolves by id at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConnection {
    pub conn_id: String,
    pub uri: String,
}

impl FrameworkConnection {
    /// Environment prefix the framework scans for connection URIs.
    pub const ENV_PREFIX: &'static str = "AIRFLOW_CONN_";

    /// Object-store connection with the secret form-encoded into the URI.
    #[must_use]
    pub fn object_store(conn_id: &str, access_key: &str, secret_key: &str) -> Self {
        let secret: String = url::form_urlencoded::byte_serialize(secret_key.as_bytes()).collect();
        Self {
            conn_id: conn_id.to_string(),
            uri: format!("s3://{access_key}:{secret}@S3"),
        }
    }

    /// Name of the environment variable that carries this connection.
    #[must_use]
    pub fn env_var(&self) -> String {
        format!("{}{}", Self::ENV_PREFIX, self.conn_id.to_uppercase())
    }
}
