//! Pipeline names and object-store watch paths.

use std::sync::LazyLock;

use clickdag_types::{DocumentId, WorkflowConfig};
use regex::Regex;

/// Placeholder the key sensor replaces with the partition date.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Separator between the snake-cased name and the workflow id.
pub const ETL_SEPARATOR: &str = "__etl__";

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\-\.\s]").expect("valid separator regex"));

/// Lowercase `input` and replace `-`, `.` and whitespace with `_`.
#[must_use]
pub fn snake_case(input: &str) -> String {
    SEPARATOR_RE
        .replace_all(&input.to_lowercase(), "_")
        .into_owned()
}

/// `<snake_case(name or fallback)>__etl__<id>`.
#[must_use]
pub fn pipeline_name(workflow: &WorkflowConfig, fallback: &str) -> String {
    let name = workflow.name.as_deref().unwrap_or(fallback);
    format!("{}{ETL_SEPARATOR}{}", snake_case(name), workflow.id)
}

/// Base key watched for a workflow: `<prefix>/<id>/{date}/`.
#[must_use]
pub fn watch_path(prefix: &str, workflow_id: &DocumentId) -> String {
    format!(
        "{}/{workflow_id}/{DATE_PLACEHOLDER}/",
        prefix.trim_end_matches('/')
    )
}

/// Key of one table under the base watch path.
#[must_use]
pub fn table_key(base: &str, table: &str) -> String {
    format!("{base}{table}")
}
