//! Table-copy activity parameters.
//!
//! [`ClickstreamActivity`] is the validated projection of one table copy:
//! where the data goes (warehouse connection), which table, and which batch
//! image runs it. Validity is advisory. Missing fields are logged and the
//! payload is serialized anyway with nulls.

use clickdag_types::{Activity, DocumentId};
use serde::{Deserialize, Serialize};

use crate::config::settings::GeneratorSettings;

/// Prefix of the task id derived from the table name.
pub const TASK_ID_PREFIX: &str = "redshift_copy_";

/// Image version used when the image reference has no `:version`.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// Split `name[:version]` at the first colon.
#[must_use]
pub fn split_name_ver(name_ver: &str) -> (String, String) {
    match name_ver.split_once(':') {
        Some((name, version)) => (name.to_string(), version.to_string()),
        None => (name_ver.to_string(), DEFAULT_IMAGE_VERSION.to_string()),
    }
}

/// Parameters for copying one clickstream table into the warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickstreamActivity {
    pub workflow_id: Option<String>,
    pub table_name: Option<String>,
    pub redshift_host: Option<String>,
    pub redshift_port: Option<String>,
    pub redshift_db: Option<String>,
    pub redshift_schema: Option<String>,
    pub redshift_user: Option<String>,
    pub redshift_password: Option<String>,
    pub redshift_encrypted: Option<bool>,
    pub temp_bucket: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl ClickstreamActivity {
    /// Set image name and version from a `name[:version]` reference.
    /// `None` leaves both unset.
    #[must_use]
    pub fn with_image(mut self, name_ver: Option<&str>) -> Self {
        let (name, version) = match name_ver.map(split_name_ver) {
            Some((name, version)) => (Some(name), Some(version)),
            None => (None, None),
        };
        self.name = name;
        self.version = version;
        self
    }

    /// Copy of `table` for `workflow_id`, with the warehouse, bucket and
    /// image taken from the generator settings.
    #[must_use]
    pub fn from_settings(
        workflow_id: &DocumentId,
        table: &str,
        settings: &GeneratorSettings,
    ) -> Self {
        let wh = &settings.warehouse;
        Self {
            workflow_id: Some(workflow_id.to_string()),
            table_name: Some(table.to_string()),
            redshift_host: wh.host.clone(),
            redshift_port: wh.port.clone(),
            redshift_db: wh.db.clone(),
            redshift_schema: wh.schema.clone(),
            redshift_user: wh.user.clone(),
            redshift_password: wh.password.clone(),
            redshift_encrypted: Some(wh.encrypted),
            temp_bucket: settings.object_store.bucket.clone(),
            name: None,
            version: None,
        }
        .with_image(Some(settings.batch_image.as_str()))
    }

    /// Projection of a stored activity. The warehouse comes from the
    /// activity's joined connection; schema and image fall back to the
    /// generator settings.
    #[must_use]
    pub fn from_activity(
        workflow_id: &DocumentId,
        activity: &Activity,
        settings: &GeneratorSettings,
    ) -> Self {
        let conn = activity.resolved_connection();
        let image = activity
            .image()
            .unwrap_or_else(|| settings.batch_image.clone());
        Self {
            workflow_id: Some(workflow_id.to_string()),
            table_name: activity.table.clone(),
            redshift_host: conn.and_then(|c| c.host.clone()),
            redshift_port: conn.and_then(|c| c.port.clone()),
            redshift_db: conn.and_then(|c| c.db.clone()),
            redshift_schema: conn
                .and_then(|c| c.schema.clone())
                .or_else(|| settings.warehouse.schema.clone()),
            redshift_user: conn.and_then(|c| c.user.clone()),
            redshift_password: conn.and_then(|c| c.password.clone()),
            redshift_encrypted: conn.and_then(|c| c.encrypted),
            temp_bucket: settings.object_store.bucket.clone(),
            name: None,
            version: None,
        }
        .with_image(Some(image.as_str()).filter(|i| !i.is_empty()))
    }

    /// Task id of the copy step; unique per workflow as long as table names are.
    #[must_use]
    pub fn task_id(&self) -> String {
        format!("{TASK_ID_PREFIX}{}", self.table_name.as_deref().unwrap_or_default())
    }

    /// Names of the required fields that are unset, in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("workflow_id", self.workflow_id.is_some()),
            ("table_name", self.table_name.is_some()),
            ("redshift_host", self.redshift_host.is_some()),
            ("redshift_port", self.redshift_port.is_some()),
            ("redshift_db", self.redshift_db.is_some()),
            ("redshift_schema", self.redshift_schema.is_some()),
            ("redshift_user", self.redshift_user.is_some()),
            ("redshift_password", self.redshift_password.is_some()),
            ("redshift_encrypted", self.redshift_encrypted.is_some()),
            ("temp_bucket", self.temp_bucket.is_some()),
            ("name", self.name.is_some()),
            ("version", self.version.is_some()),
        ];
        required
            .into_iter()
            .filter_map(|(field, present)| (!present).then_some(field))
            .collect()
    }

    /// True iff every required field is set. Logs one line per missing field.
    pub fn is_valid(&self) -> bool {
        let missing = self.missing_fields();
        for field in &missing {
            tracing::info!(
                table = self.table_name.as_deref().unwrap_or_default(),
                "Clickstream param {field} is missing"
            );
        }
        missing.is_empty()
    }

    /// Nested payload for the container-job operator.
    #[must_use]
    pub fn serialize(&self) -> ActivityPayload {
        ActivityPayload {
            task_id: self.task_id(),
            name: self.name.clone(),
            version: self.version.clone(),
            config: PayloadConfig {
                app_id: self.workflow_id.clone(),
                table: self.table_name.clone(),
                connection: PayloadConnection {
                    host: self.redshift_host.clone(),
                    port: self.redshift_port.clone(),
                    db: self.redshift_db.clone(),
                    user: self.redshift_user.clone(),
                    password: self.redshift_password.clone(),
                    encrypted: self.redshift_encrypted,
                },
                redshift_schema: self.redshift_schema.clone(),
                temp_bucket: self.temp_bucket.clone(),
                timedelta: 0,
            },
        }
    }
}

/// Serialized [`ClickstreamActivity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub task_id: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub config: PayloadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadConfig {
    #[serde(rename = "appId")]
    pub app_id: Option<String>,
    pub table: Option<String>,
    pub connection: PayloadConnection,
    pub redshift_schema: Option<String>,
    pub temp_bucket: Option<String>,
    pub timedelta: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadConnection {
    pub host: Option<String>,
    pub port: Option<String>,
    pub db: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "_encrypted")]
    pub encrypted: Option<bool>,
}
