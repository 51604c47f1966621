//! Generation error model.

use clickdag_store::StoreError;

/// Why a generation run aborted. Every variant is fatal: nothing is
/// returned for any workflow when one is raised.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Config store unreachable, or returned undecodable documents.
    #[error("config store: {0}")]
    Store(#[from] StoreError),

    /// Generator settings failed validation.
    #[error(transparent)]
    Settings(#[from] anyhow::Error),
}

impl GenerateError {
    /// Returns the store error if this is a `Store` variant.
    #[must_use]
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            Self::Settings(_) => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GenerateError>;
