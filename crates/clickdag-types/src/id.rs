//! Document identifiers.

use serde::{Deserialize, Deserializer, Serialize};

/// A store document `_id`, rendered as a string.
///
/// Deserializes from a plain string, an integer, or an extended-JSON
/// ObjectId (`{"$oid": "<hex>"}`), which becomes its hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new document identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Plain(String),
    Int(i64),
    ObjectId {
        #[serde(rename = "$oid")]
        oid: String,
    },
    NumberLong {
        #[serde(rename = "$numberLong")]
        value: String,
    },
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawId::deserialize(deserializer)?;
        Ok(match raw {
            RawId::Plain(s) => Self(s),
            RawId::Int(n) => Self(n.to_string()),
            RawId::ObjectId { oid } => Self(oid),
            RawId::NumberLong { value } => Self(value),
        })
    }
}
