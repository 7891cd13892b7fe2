//! Error types for password manager operations.
//!
//! "Not found" is never an error at this level: lookups report an absent
//! secret as `None`. Errors are reserved for requests that could not be
//! carried out at all.

use crate::backend::BackendError;

/// Errors returned by [`PasswordManager`](crate::PasswordManager).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identifier was empty.
    #[error("identifier must not be empty")]
    InvalidIdentifier,

    /// The platform keychain rejected or could not service the request.
    #[error("keychain unavailable for '{identifier}': {source}")]
    StorageUnavailable {
        /// Identifier the failed request was for
        identifier: String,
        /// Failure reported by the backend
        #[source]
        source: BackendError,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a backend failure for the given identifier.
    pub fn storage(identifier: impl Into<String>, source: BackendError) -> Self {
        Self::StorageUnavailable {
            identifier: identifier.into(),
            source,
        }
    }

    /// The backend failure behind this error, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::StorageUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether unlocking the device could make a retry succeed.
    pub fn requires_unlock(&self) -> bool {
        self.backend_error()
            .map(BackendError::requires_unlock)
            .unwrap_or(false)
    }
}
