//! MongoDB-backed implementation of [`ConfigStore`].
//!
//! One client per generation run. The driver pools connections internally;
//! [`ConfigStore::close`] shuts the pool down.

use async_trait::async_trait;
use clickdag_types::WorkflowConfig;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, Tls, TlsOptions};
use mongodb::{Client, Database};

use crate::aggregation::denormalize_pipeline;
use crate::backend::{ConfigCollection, ConfigStore, StoreSettings};
use crate::error::{self, StoreError};

const APP_NAME: &str = "clickdag";

/// MongoDB config store.
///
/// Create with [`MongoConfigStore::connect`]; the connection string must
/// name the database holding the config collections.
pub struct MongoConfigStore {
    client: Client,
    db: Database,
}

impl MongoConfigStore {
    /// Parse the connection string and open a client.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Mongo`] if the connection string is invalid or
    /// the client cannot be built, and [`StoreError::NoDefaultDatabase`] if
    /// the string names no database.
    pub async fn connect(settings: &StoreSettings) -> error::Result<Self> {
        tracing::info!("Connecting to config store");
        let mut options = ClientOptions::parse(settings.url.as_str()).await?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_string());

        if settings.allow_invalid_certificates {
            tracing::warn!("TLS certificate verification is disabled for the config store");
            allow_invalid_certificates(&mut options);
        }

        let client = Client::with_options(options)?;
        let Some(db) = client.default_database() else {
            client.shutdown().await;
            return Err(StoreError::NoDefaultDatabase);
        };
        tracing::debug!(database = db.name(), "Config store client ready");
        Ok(Self { client, db })
    }
}

/// Turn off certificate verification, keeping any TLS options the
/// connection string already set. An explicit `tls=false` stays disabled.
fn allow_invalid_certificates(options: &mut ClientOptions) {
    match options.tls.as_mut() {
        Some(Tls::Enabled(tls)) => tls.allow_invalid_certificates = Some(true),
        Some(Tls::Disabled) => {}
        None => {
            let tls = TlsOptions::builder().allow_invalid_certificates(true).build();
            options.tls = Some(Tls::Enabled(tls));
        }
    }
}

/// Bridge a BSON document into the serde model through relaxed extended
/// JSON, so ObjectIds arrive as `{"$oid": ...}`.
fn decode(collection: ConfigCollection, document: Document) -> error::Result<WorkflowConfig> {
    let json = Bson::Document(document).into_relaxed_extjson();
    serde_json::from_value(json).map_err(|source| StoreError::Decode {
        collection: collection.as_str().to_string(),
        source,
    })
}

#[async_trait]
impl ConfigStore for MongoConfigStore {
    async fn denormalized(
        &self,
        collection: ConfigCollection,
    ) -> error::Result<Vec<WorkflowConfig>> {
        let cursor = self
            .db
            .collection::<Document>(collection.as_str())
            .aggregate(denormalize_pipeline())
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        tracing::debug!(
            collection = collection.as_str(),
            documents = documents.len(),
            "Aggregation complete"
        );
        documents
            .into_iter()
            .map(|d| decode(collection, d))
            .collect()
    }

    async fn ping(&self) -> error::Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn close(&self) {
        tracing::debug!("Closing config store client");
        self.client.clone().shutdown().await;
    }
}
