//! Config store trait definition.
//!
//! [`ConfigStore`] defines the read contract for workflow-shaped
//! collections. Every read runs the same denormalizing join (see
//! [`aggregation`](crate::aggregation)) against a different collection.

use async_trait::async_trait;
use clickdag_types::WorkflowConfig;
use serde::{Deserialize, Serialize};

use crate::error;

/// Collection joined against by every read.
pub const CONNECTION_CONFIGS: &str = "connectionConfigs";

/// The workflow-shaped collections a store can be asked to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigCollection {
    Workflows,
    Webhooks,
    Ftp,
    Clickstream,
}

impl ConfigCollection {
    /// Every collection, in a stable order.
    pub const ALL: [Self; 4] = [Self::Workflows, Self::Webhooks, Self::Ftp, Self::Clickstream];

    /// Stored collection name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workflows => "workflows",
            Self::Webhooks => "webhookConfigs",
            Self::Ftp => "ftpConfigs",
            Self::Clickstream => "clickstreamConfigs",
        }
    }
}

impl ConfigCollection {
    /// Name used on the command line and in settings files.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Workflows => "workflows",
            Self::Webhooks => "webhooks",
            Self::Ftp => "ftp",
            Self::Clickstream => "clickstream",
        }
    }
}

impl std::fmt::Display for ConfigCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigCollection {
    type Err = String;

    /// Accepts the short name (`clickstream`) or the stored name
    /// (`clickstreamConfigs`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.short_name() == s || c.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|c| c.short_name()).collect();
                format!("unknown collection '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// How to reach the config store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Connection string; must name a default database.
    pub url: String,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    #[serde(default)]
    pub allow_invalid_certificates: bool,
}

/// Read contract for workflow configuration.
///
/// Implementations must be `Send + Sync` for use behind `Box<dyn ConfigStore>`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Run the denormalizing join against `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::error::StoreError) on connectivity or
    /// decode failure. No partial results are returned.
    async fn denormalized(&self, collection: ConfigCollection)
        -> error::Result<Vec<WorkflowConfig>>;

    /// Check the store answers at all.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::error::StoreError) when unreachable.
    async fn ping(&self) -> error::Result<()>;

    /// Release the underlying connection. Safe to call more than once.
    async fn close(&self);

    /// Denormalized `workflows` documents.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::denormalized`].
    async fn workflow_configs(&self) -> error::Result<Vec<WorkflowConfig>> {
        self.denormalized(ConfigCollection::Workflows).await
    }

    /// Denormalized `webhookConfigs` documents.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::denormalized`].
    async fn webhook_configs(&self) -> error::Result<Vec<WorkflowConfig>> {
        self.denormalized(ConfigCollection::Webhooks).await
    }

    /// Denormalized `ftpConfigs` documents.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::denormalized`].
    async fn ftp_configs(&self) -> error::Result<Vec<WorkflowConfig>> {
        self.denormalized(ConfigCollection::Ftp).await
    }

    /// Denormalized `clickstreamConfigs` documents.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::denormalized`].
    async fn clickstream_configs(&self) -> error::Result<Vec<WorkflowConfig>> {
        self.denormalized(ConfigCollection::Clickstream).await
    }
}
