//! Generator settings and their environment-variable mapping.

use anyhow::{bail, Result};
use clickdag_store::StoreSettings;
use clickdag_types::FrameworkConnection;
use serde::{Deserialize, Serialize};

pub const ENV_MONGO_URL: &str = "MONGO_URL";
pub const ENV_MONGO_TLS_INSECURE: &str = "MONGO_TLS_INSECURE";
pub const ENV_BUCKET: &str = "AWS_S3_CLICKSTREAM_BUCKET";
pub const ENV_BATCH_IMAGE: &str = "CLICKSTREAM_BATCH_IMAGE";
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_REDSHIFT_HOST: &str = "REDSHIFT_HOST";
pub const ENV_REDSHIFT_PORT: &str = "REDSHIFT_PORT";
pub const ENV_REDSHIFT_DB: &str = "REDSHIFT_DB";
pub const ENV_REDSHIFT_USER: &str = "REDSHIFT_USER";
pub const ENV_REDSHIFT_PASSWORD: &str = "REDSHIFT_PASSWORD";
pub const ENV_REDSHIFT_SCHEMA: &str = "REDSHIFT_SCHEMA";
pub const ENV_REDSHIFT_ENCRYPTED: &str = "REDSHIFT_ENCRYPTED";
pub const ENV_BATCH_POOL: &str = "AIRFLOW_CLICKSTREAM_BATCH_POOL";

/// Everything a generation run needs besides the workflow documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub store: StoreSettings,
    /// Batch-processing image as `name[:version]`.
    #[serde(default)]
    pub batch_image: String,
    /// Execution pool the copy jobs are constrained to.
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
    #[serde(default)]
    pub warehouse: WarehouseSettings,
    #[serde(default)]
    pub sensors: SensorSettings,
    #[serde(default)]
    pub defaults: PipelineDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// Watched bucket; also the copy jobs' temp bucket.
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_connection_id")]
    pub connection_id: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
}

fn default_prefix() -> String {
    "clickstream-data".to_string()
}
fn default_connection_id() -> String {
    "S3_CONNECTION".to_string()
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: default_prefix(),
            connection_id: default_connection_id(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl ObjectStoreSettings {
    /// The connection the framework's sensors use to reach the bucket.
    #[must_use]
    pub fn framework_connection(&self) -> FrameworkConnection {
        FrameworkConnection::object_store(
            &self.connection_id,
            &self.access_key_id,
            &self.secret_access_key,
        )
    }
}

/// Destination warehouse connection handed to every copy job. Unset fields
/// are passed through as nulls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSettings {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSettings {
    #[serde(default = "default_poke_interval")]
    pub poke_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_poke_interval")]
    pub table_poke_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub table_timeout_secs: u64,
    /// Partition offset, in minutes, of the delayed branch.
    #[serde(default = "default_delayed_offset")]
    pub delayed_offset: u32,
}

fn default_poke_interval() -> u64 {
    5
}
fn default_timeout() -> u64 {
    10
}
fn default_delayed_offset() -> u32 {
    15
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            poke_interval_secs: default_poke_interval(),
            timeout_secs: default_timeout(),
            table_poke_interval_secs: default_poke_interval(),
            table_timeout_secs: default_timeout(),
            delayed_offset: default_delayed_offset(),
        }
    }
}

/// Pipeline-level defaults copied into every definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefaults {
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Substituted for a workflow without a `name` before case conversion.
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

fn default_schedule_interval() -> String {
    "*/15 * * * *".to_string()
}
fn default_owner() -> String {
    "astronomer".to_string()
}
fn default_retry_delay() -> u64 {
    300
}
fn default_fallback_name() -> String {
    "TEST_astronomer_clickstream_to_redshift".to_string()
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            schedule_interval: default_schedule_interval(),
            owner: default_owner(),
            email: None,
            retry_delay_secs: default_retry_delay(),
            fallback_name: default_fallback_name(),
        }
    }
}

impl GeneratorSettings {
    /// Settings with only the two required values set.
    #[must_use]
    pub fn new(store_url: impl Into<String>, batch_image: impl Into<String>) -> Self {
        Self {
            store: StoreSettings {
                url: store_url.into(),
                allow_invalid_certificates: false,
            },
            batch_image: batch_image.into(),
            pool: None,
            object_store: ObjectStoreSettings::default(),
            warehouse: WarehouseSettings::default(),
            sensors: SensorSettings::default(),
            defaults: PipelineDefaults::default(),
        }
    }

    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean variable holds something other than a
    /// recognised flag value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`, which maps a variable name to its
    /// value. Values are trimmed and blank ones count as unset. Required
    /// values that are missing
    /// are left empty for [`validate_settings`](super::validator::validate_settings)
    /// to report.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean variable holds something other than a
    /// recognised flag value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::new(
            get(ENV_MONGO_URL).unwrap_or_default(),
            get(ENV_BATCH_IMAGE).unwrap_or_default(),
        );
        settings.store.allow_invalid_certificates =
            parse_flag(ENV_MONGO_TLS_INSECURE, get(ENV_MONGO_TLS_INSECURE))?;
        settings.pool = get(ENV_BATCH_POOL);
        settings.object_store.bucket = get(ENV_BUCKET);
        settings.object_store.access_key_id = get(ENV_ACCESS_KEY_ID).unwrap_or_default();
        settings.object_store.secret_access_key = get(ENV_SECRET_ACCESS_KEY).unwrap_or_default();
        settings.warehouse = WarehouseSettings {
            host: get(ENV_REDSHIFT_HOST),
            port: get(ENV_REDSHIFT_PORT),
            db: get(ENV_REDSHIFT_DB),
            user: get(ENV_REDSHIFT_USER),
            password: get(ENV_REDSHIFT_PASSWORD),
            schema: get(ENV_REDSHIFT_SCHEMA),
            encrypted: parse_flag(ENV_REDSHIFT_ENCRYPTED, get(ENV_REDSHIFT_ENCRYPTED))?,
        };
        Ok(settings)
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean flag, got '{other}'"),
    }
}
