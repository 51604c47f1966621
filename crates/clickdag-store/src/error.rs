//! Config store error types.

/// Errors produced by [`ConfigStore`](crate::ConfigStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying driver failure (connect, auth, query, cursor).
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The connection string names no database to read from.
    #[error("connection string has no default database")]
    NoDefaultDatabase,

    /// An aggregated document did not match the workflow model.
    #[error("failed to decode document from '{collection}': {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// In-memory collection seed data was malformed.
    #[error("invalid seed data: {0}")]
    Seed(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_collection() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = StoreError::Decode {
            collection: "workflows".into(),
            source,
        };
        assert!(err.to_string().contains("'workflows'"), "got: {err}");
    }

    #[test]
    fn no_default_database_displays() {
        assert_eq!(
            StoreError::NoDefaultDatabase.to_string(),
            "connection string has no default database"
        );
    }

    #[test]
    fn seed_error_wraps_message() {
        let err = StoreError::Seed("expected an array".into());
        assert!(err.to_string().contains("expected an array"));
    }
}
