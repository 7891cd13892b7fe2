//! Core trait for keychain backends.

use std::fmt;

use crate::item::{ItemKey, KeychainItem};

/// Error codes for backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BackendErrorCode {
    /// Item not found
    NotFound = 1000,
    /// Access denied (entitlement or user refusal)
    AccessDenied = 2000,
    /// Keychain is locked
    Locked = 2001,
    /// Keychain service could not be reached
    Unavailable = 3000,
    /// Stored data was not a valid secret
    InvalidData = 4000,
    /// Platform not supported
    Unsupported = 6000,
    /// Internal error
    Internal = 9999,
}

/// Error type for backend operations.
#[derive(Debug, Clone)]
pub struct BackendError {
    /// Error code
    pub code: BackendErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Identifier related to the error (if applicable)
    pub identifier: Option<String>,
}

impl BackendError {
    /// Create a new error.
    pub fn new(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            identifier: None,
        }
    }

    /// Create a new error with the associated identifier.
    pub fn with_identifier(
        code: BackendErrorCode,
        message: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            identifier: Some(identifier.into()),
        }
    }

    /// Create a "not found" error.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            code: BackendErrorCode::NotFound,
            message: format!("Item not found: {}", identifier),
            identifier: Some(identifier),
        }
    }

    /// Create a "locked" error.
    pub fn locked(identifier: impl Into<String>) -> Self {
        Self::with_identifier(BackendErrorCode::Locked, "Keychain is locked", identifier)
    }

    /// Create an "unavailable" error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::Unavailable, reason)
    }

    /// Create an "unsupported" error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::new(
            BackendErrorCode::Unsupported,
            format!("Feature not supported: {}", feature.into()),
        )
    }

    /// Check if this error indicates the item wasn't found.
    pub fn is_not_found(&self) -> bool {
        self.code == BackendErrorCode::NotFound
    }

    /// Check if unlocking the device could make a retry succeed.
    pub fn requires_unlock(&self) -> bool {
        matches!(
            self.code,
            BackendErrorCode::Locked | BackendErrorCode::AccessDenied
        )
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(identifier) if !self.message.contains(identifier.as_str()) => {
                write!(f, "{} (identifier: {})", self.message, identifier)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Platform secure-storage service.
///
/// Each call is one synchronous round trip to the platform store. The
/// backend owns persistence, encryption and access-control enforcement;
/// callers only address items and pass the attributes to write them with.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait KeychainBackend: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Insert the item, or update the existing item with the same key in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform store rejects the write.
    fn add_or_update(&self, item: &KeychainItem) -> BackendResult<()>;

    /// Fetch the secret stored under `key`.
    ///
    /// # Returns
    ///
    /// The secret, or `None` if no such item exists.
    fn fetch(&self, key: &ItemKey) -> BackendResult<Option<String>>;

    /// Remove the item stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only on platform errors (not if the item doesn't exist).
    fn remove(&self, key: &ItemKey) -> BackendResult<()>;

    /// Check if an item exists.
    fn contains(&self, key: &ItemKey) -> BackendResult<bool> {
        Ok(self.fetch(key)?.is_some())
    }
}
