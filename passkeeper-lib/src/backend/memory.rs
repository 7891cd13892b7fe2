//! In-memory keychain backend.
//!
//! This implementation is for testing and development only.
//! In production, use the platform backend from
//! [`default_backend`](super::default_backend).
//!
//! # Thread Safety
//!
//! This storage uses `RwLock` for thread-safe access. Lock poisoning
//! is handled gracefully by returning an error rather than panicking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::traits::{BackendError, BackendErrorCode, BackendResult, KeychainBackend};
use crate::config::AccessMode;
use crate::item::{ItemKey, KeychainItem};

/// Attributes an item was last written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttributes {
    /// Accessibility class
    pub access_mode: AccessMode,
    /// Whether the item may migrate
    pub migratable: bool,
}

/// In-memory keychain.
///
/// **Warning**: This is for testing only. Secrets are not encrypted
/// and will be lost when the process exits.
pub struct InMemoryKeychain {
    items: RwLock<HashMap<ItemKey, KeychainItem>>,
    available: AtomicBool,
    fetches: AtomicUsize,
}

/// Helper function to handle lock poisoning gracefully.
fn lock_error(context: &str) -> BackendError {
    BackendError::new(
        BackendErrorCode::Internal,
        format!("InMemoryKeychain: lock poisoned during {}", context),
    )
}

impl InMemoryKeychain {
    /// Create an empty in-memory keychain.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Simulate the store becoming unreachable (or reachable again).
    ///
    /// While unavailable every operation fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `fetch` calls that reached this backend.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Attributes of the stored item, if present.
    pub fn stored_attributes(&self, key: &ItemKey) -> Option<StoredAttributes> {
        let items = self.items.read().ok()?;
        items.get(key).map(|item| StoredAttributes {
            access_mode: item.access_mode,
            migratable: item.migratable,
        })
    }

    /// Get the number of stored items.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.items.read().map(|i| i.len()).unwrap_or(0)
    }

    /// Check if the keychain is empty.
    ///
    /// Returns true if the lock is poisoned.
    pub fn is_empty(&self) -> bool {
        self.items.read().map(|i| i.is_empty()).unwrap_or(true)
    }

    fn ensure_available(&self) -> BackendResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::unavailable("in-memory keychain switched off"))
        }
    }
}

impl Default for InMemoryKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl KeychainBackend for InMemoryKeychain {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn add_or_update(&self, item: &KeychainItem) -> BackendResult<()> {
        self.ensure_available()?;
        let mut items = self.items.write().map_err(|_| lock_error("add_or_update"))?;
        items.insert(item.key.clone(), item.clone());
        Ok(())
    }

    fn fetch(&self, key: &ItemKey) -> BackendResult<Option<String>> {
        self.ensure_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let items = self.items.read().map_err(|_| lock_error("fetch"))?;
        Ok(items.get(key).map(|item| item.secret.clone()))
    }

    fn remove(&self, key: &ItemKey) -> BackendResult<()> {
        self.ensure_available()?;
        let mut items = self.items.write().map_err(|_| lock_error("remove"))?;
        items.remove(key);
        Ok(())
    }
}
