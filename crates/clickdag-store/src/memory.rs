//! In-process [`ConfigStore`] over JSON documents.
//!
//! Evaluates the same stages as [`aggregation::denormalize_pipeline`]
//! (unwind, left join, regroup) so join behaviour can be exercised without
//! a server. Documents use relaxed extended JSON, as the Mongo store
//! decodes them.
//!
//! [`aggregation::denormalize_pipeline`]: crate::aggregation::denormalize_pipeline

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use clickdag_types::WorkflowConfig;
use serde_json::{Map, Value};

use crate::aggregation::GROUPED_FIELDS;
use crate::backend::{ConfigCollection, ConfigStore, CONNECTION_CONFIGS};
use crate::error::{self, StoreError};

/// In-memory config store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    collections: HashMap<String, Vec<Value>>,
    closed: AtomicBool,
}

impl MemoryConfigStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add documents to a collection (builder style).
    #[must_use]
    pub fn with_documents(mut self, collection: &str, documents: Vec<Value>) -> Self {
        self.insert_many(collection, documents);
        self
    }

    /// Append documents to a collection.
    pub fn insert_many(&mut self, collection: &str, documents: Vec<Value>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Build a store from `{"<collection>": [<documents>...], ...}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Seed`] if the seed is not an object of arrays.
    pub fn from_seed(seed: Value) -> error::Result<Self> {
        let Value::Object(map) = seed else {
            return Err(StoreError::Seed("expected an object of collections".into()));
        };
        let mut store = Self::new();
        for (name, documents) in map {
            let Value::Array(documents) = documents else {
                return Err(StoreError::Seed(format!(
                    "collection '{name}' must be an array of documents"
                )));
            };
            store.insert_many(&name, documents);
        }
        Ok(store)
    }

    /// Whether [`ConfigStore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn documents(&self, collection: &str) -> &[Value] {
        self.collections.get(collection).map_or(&[], Vec::as_slice)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn denormalized(
        &self,
        collection: ConfigCollection,
    ) -> error::Result<Vec<WorkflowConfig>> {
        let joined = denormalize(
            self.documents(collection.as_str()),
            self.documents(CONNECTION_CONFIGS),
        );
        joined
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc).map_err(|source| StoreError::Decode {
                    collection: collection.as_str().to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn ping(&self) -> error::Result<()> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Stage evaluation
// ---------------------------------------------------------------------------

/// Join every workflow's activities to their connections and VPN
/// connections, one output document per workflow that has activities.
#[must_use]
pub fn denormalize(workflows: &[Value], connections: &[Value]) -> Vec<Value> {
    let mut order: Vec<Value> = Vec::new();
    let mut groups: Vec<(Map<String, Value>, Vec<Value>)> = Vec::new();

    for workflow in workflows {
        let id = workflow.get("_id").cloned().unwrap_or(Value::Null);
        let rows: Vec<Value> = unwind(workflow.get("activityList"))
            .into_iter()
            .flat_map(|activity| join_activity(activity, connections))
            .collect();
        if rows.is_empty() {
            continue;
        }

        if let Some(pos) = order.iter().position(|seen| *seen == id) {
            groups[pos].1.extend(rows);
            continue;
        }

        let mut head = Map::new();
        head.insert("_id".into(), id.clone());
        for field in GROUPED_FIELDS {
            head.insert(
                field.into(),
                workflow.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        order.push(id);
        groups.push((head, rows));
    }

    groups
        .into_iter()
        .map(|(mut head, activities)| {
            head.insert("activityList".into(), Value::Array(activities));
            Value::Object(head)
        })
        .collect()
}

/// `$unwind` without preservation: missing, null and empty arrays yield
/// nothing; a non-array value yields itself.
fn unwind(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// `$lookup` on `_id`. A missing or null local value matches documents
/// without an `_id`; an array matches any of its elements.
fn lookup(connections: &[Value], local: Option<&Value>) -> Vec<Value> {
    connections
        .iter()
        .filter(|c| {
            let foreign = c.get("_id").filter(|v| !v.is_null());
            match local {
                None | Some(Value::Null) => foreign.is_none(),
                Some(Value::Array(items)) => foreign.is_some_and(|f| items.contains(f)),
                Some(v) => foreign == Some(v),
            }
        })
        .cloned()
        .collect()
}

/// Both lookups for a single activity, each followed by a preserving
/// unwind.
fn join_activity(activity: Value, connections: &[Value]) -> Vec<Value> {
    let matches = lookup(connections, activity.get("connection"));

    let with_connection: Vec<Value> = if matches.is_empty() {
        let mut row = activity;
        ensure_object(child(&mut row, "config")).remove("connection");
        vec![row]
    } else {
        matches
            .into_iter()
            .map(|conn| {
                let mut row = activity.clone();
                ensure_object(child(&mut row, "config")).insert("connection".into(), conn);
                row
            })
            .collect()
    };

    with_connection
        .into_iter()
        .flat_map(|mut row| {
            let local = row.pointer("/config/connection/vpnConnection").cloned();
            let vpn_matches = lookup(connections, local.as_ref());
            if vpn_matches.is_empty() {
                connection_of(&mut row).remove("vpnConnection");
                return vec![row];
            }
            vpn_matches
                .into_iter()
                .map(|vpn| {
                    let mut out = row.clone();
                    connection_of(&mut out).insert("vpnConnection".into(), vpn);
                    out
                })
                .collect()
        })
        .collect()
}

/// `config.connection` of an activity row, created along the way as a
/// lookup's `as` path would be.
fn connection_of(row: &mut Value) -> &mut Map<String, Value> {
    ensure_object(child(child(row, "config"), "connection"))
}

/// Turn `value` into an object if it is not one already.
fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        unreachable!("value was replaced with an object above");
    };
    map
}

fn child<'a>(parent: &'a mut Value, key: &str) -> &'a mut Value {
    ensure_object(parent)
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
}
