//! Workflow documents as returned by the config store aggregation.
//!
//! Field names follow the stored camelCase documents. Everything the join
//! may leave out is optional; a connection reference that did not resolve
//! shows up as an empty `config.connection` document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::id::DocumentId;

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// One denormalized workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(
        default,
        rename = "pokeInterval",
        deserialize_with = "de_opt_u64_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub poke_interval: Option<u64>,
    #[serde(
        default,
        deserialize_with = "de_opt_u64_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<u64>,
    #[serde(default, rename = "accountId", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<DocumentId>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub tables: Vec<String>,
    #[serde(default, rename = "activityList", deserialize_with = "de_null_as_default")]
    pub activities: Vec<Activity>,
}

impl WorkflowConfig {
    /// Create a workflow with only an id; everything else empty.
    #[must_use]
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            path: None,
            schedule: None,
            poke_interval: None,
            timeout: None,
            account_id: None,
            tables: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// Tables this workflow expects data for.
    ///
    /// The explicit `tables` list wins; without one, the tables named by the
    /// activities are used, in activity order.
    #[must_use]
    pub fn declared_tables(&self) -> Vec<&str> {
        if !self.tables.is_empty() {
            return self.tables.iter().map(String::as_str).collect();
        }
        self.activities
            .iter()
            .filter_map(|a| a.table.as_deref())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// One activity of a workflow, with its connection joined in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Reference to a `connectionConfigs` document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Job image name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Job image version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub config: ActivityConfig,
}

impl Activity {
    /// The joined connection, if the reference resolved.
    #[must_use]
    pub fn resolved_connection(&self) -> Option<&ConnectionConfig> {
        self.config
            .connection
            .as_ref()
            .filter(|c| c.is_resolved())
    }

    /// Job image as a single `name[:version]` string.
    #[must_use]
    pub fn image(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match self.version.as_deref() {
            Some(version) => format!("{name}:{version}"),
            None => name.to_string(),
        })
    }
}

/// Activity `config` block. The join writes the connection here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A `connectionConfigs` document, possibly with its VPN connection inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "_encrypted", default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(
        rename = "vpnConnection",
        default,
        deserialize_with = "de_opt_resolved_connection",
        skip_serializing_if = "Option::is_none"
    )]
    pub vpn_connection: Option<Box<ConnectionConfig>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConnectionConfig {
    /// Whether this is a real joined document rather than the empty
    /// placeholder left behind by an unmatched lookup.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

fn de_opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.map(|s| match s {
        Scalar::Text(t) => t,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

fn de_opt_u64_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    use serde::de::Error;

    match Option::<Scalar>::deserialize(d)? {
        None => Ok(None),
        Some(Scalar::Int(n)) => u64::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a non-negative integer, got {n}"))),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(Scalar::Float(f)) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
        Some(Scalar::Float(f)) => Err(D::Error::custom(format!(
            "expected a non-negative integer, got {f}"
        ))),
        Some(Scalar::Text(t)) => t
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a non-negative integer, got '{t}'"))),
    }
}

fn de_null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// An unjoined `vpnConnection` is still a bare reference; only a joined
/// document is kept.
fn de_opt_resolved_connection<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Box<ConnectionConfig>>, D::Error> {
    use serde::de::Error;

    match Option::<Value>::deserialize(d)? {
        Some(value @ Value::Object(_)) if value.get("$oid").is_none() => {
            serde_json::from_value(value).map(Some).map_err(D::Error::custom)
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "_id": {"$oid": "5a1f0c2e9d3b4c0001a2b3c4"},
            "name": "Acme Clickstream",
            "schedule": "*/15 * * * *",
            "pokeInterval": 5,
            "timeout": 10.0,
            "accountId": "acct-1",
            "tables": ["page", "track", "checkout"],
            "activityList": [
                {
                    "connection": {"$oid": "5a1f0c2e9d3b4c0001a2b3c5"},
                    "table": "checkout",
                    "name": "batch-job",
                    "version": "2.1",
                    "config": {
                        "connection": {
                            "_id": {"$oid": "5a1f0c2e9d3b4c0001a2b3c5"},
                            "host": "warehouse.example.com",
                            "port": 5439,
                            "db": "events",
                            "user": "loader",
                            "password": "hunter2",
                            "_encrypted": true,
                            "vpnConnection": {"_id": "vpn-1", "host": "bastion"}
                        },
                        "batchSize": 500
                    }
                },
                {
                    "connection": "missing",
                    "table": "refund",
                    "config": {"connection": {}}
                }
            ]
        })
    }

    #[test]
    fn deserialize_denormalized_workflow() {
        let wf: WorkflowConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(wf.id.as_str(), "5a1f0c2e9d3b4c0001a2b3c4");
        assert_eq!(wf.name.as_deref(), Some("Acme Clickstream"));
        assert_eq!(wf.poke_interval, Some(5));
        assert_eq!(wf.timeout, Some(10));
        assert_eq!(wf.account_id, Some(DocumentId::new("acct-1")));
        assert_eq!(wf.activities.len(), 2);

        let first = &wf.activities[0];
        let conn = first.resolved_connection().unwrap();
        assert_eq!(conn.port.as_deref(), Some("5439"));
        assert_eq!(conn.encrypted, Some(true));
        assert_eq!(conn.vpn_connection.as_ref().unwrap().host.as_deref(), Some("bastion"));
        assert_eq!(first.config.extra["batchSize"], 500);
        assert_eq!(first.image().as_deref(), Some("batch-job:2.1"));
    }

    #[test]
    fn unmatched_connection_is_not_resolved() {
        let wf: WorkflowConfig = serde_json::from_value(sample()).unwrap();
        let second = &wf.activities[1];
        assert!(second.config.connection.is_some());
        assert!(second.resolved_connection().is_none());
        assert!(second.image().is_none());
    }

    #[test]
    fn bare_vpn_reference_is_dropped() {
        let conn: ConnectionConfig = serde_json::from_value(json!({
            "_id": "c1",
            "vpnConnection": {"$oid": "5a1f0c2e9d3b4c0001a2b3c9"}
        }))
        .unwrap();
        assert!(conn.vpn_connection.is_none());
    }

    #[test]
    fn declared_tables_prefers_explicit_list() {
        let wf: WorkflowConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(wf.declared_tables(), vec!["page", "track", "checkout"]);
    }

    #[test]
    fn declared_tables_falls_back_to_activities() {
        let mut wf: WorkflowConfig = serde_json::from_value(sample()).unwrap();
        wf.tables.clear();
        assert_eq!(wf.declared_tables(), vec!["checkout", "refund"]);
    }

    #[test]
    fn null_lists_default_to_empty() {
        let wf: WorkflowConfig =
            serde_json::from_value(json!({"_id": "w", "tables": null, "activityList": null}))
                .unwrap();
        assert!(wf.tables.is_empty());
        assert!(wf.activities.is_empty());
        assert!(wf.name.is_none());
    }

    #[test]
    fn negative_timeout_rejected() {
        let result = serde_json::from_value::<WorkflowConfig>(json!({"_id": "w", "timeout": -1}));
        assert!(result.is_err());
    }

    #[test]
    fn yaml_document_decodes_too() {
        let yaml = r#"
_id: wf-yaml
name: From YAML
activityList:
  - table: page
    name: batch-job
"#;
        let wf: WorkflowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wf.activities[0].image().as_deref(), Some("batch-job"));
    }
}
