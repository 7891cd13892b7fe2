//! Linux Secret Service backend.
//!
//! Items live in the default collection of the session's Secret Service
//! (GNOME Keyring, KWallet) and are located by the `application`,
//! `identifier` and `group` attributes. Secret Service has no notion of
//! accessibility classes or device migration, so those are recorded as
//! plain attributes and not enforced.

use std::collections::HashMap;

use secret_service::blocking::{Collection, SecretService};
use secret_service::{EncryptionType, Error as SsError};

use super::traits::{BackendError, BackendErrorCode, BackendResult, KeychainBackend};
use crate::item::{ItemKey, KeychainItem};

/// Attribute value used for items without a group.
const NO_GROUP: &str = "";

/// Secret Service backed storage.
///
/// A connection is opened per call; constructing the backend never talks
/// to the bus.
pub struct SecretServiceKeychain {
    /// Application attribute shared by every item this backend writes
    service: String,
}

fn map_error(context: &str, err: SsError) -> BackendError {
    let code = match err {
        SsError::Locked | SsError::Prompt => BackendErrorCode::Locked,
        SsError::NoResult => BackendErrorCode::NotFound,
        _ => BackendErrorCode::Unavailable,
    };
    BackendError::new(code, format!("Secret Service {} failed: {}", context, err))
}

/// Whether an item's recorded attributes differ from the ones just written.
fn is_stale(stored: &HashMap<String, String>, access_mode: &str, migratable: &str) -> bool {
    stored.get("access_mode").map(String::as_str) != Some(access_mode)
        || stored.get("migratable").map(String::as_str) != Some(migratable)
}

impl SecretServiceKeychain {
    /// Create a backend writing items under the given application name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Get the application name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn label(&self, key: &ItemKey) -> String {
        format!("{}.{}", self.service, key)
    }

    fn attributes<'a>(&'a self, key: &'a ItemKey) -> HashMap<&'a str, &'a str> {
        let mut attributes = HashMap::new();
        attributes.insert("application", self.service.as_str());
        attributes.insert("identifier", key.identifier());
        attributes.insert("group", key.group().unwrap_or(NO_GROUP));
        attributes
    }

    fn with_collection<T>(
        &self,
        f: impl FnOnce(&Collection<'_>) -> BackendResult<T>,
    ) -> BackendResult<T> {
        let ss = SecretService::connect(EncryptionType::Dh).map_err(|e| map_error("connect", e))?;
        let collection = ss
            .get_default_collection()
            .map_err(|e| map_error("default collection", e))?;

        if collection.is_locked().unwrap_or(true) {
            collection.unlock().map_err(|e| map_error("unlock", e))?;
        }

        f(&collection)
    }
}

impl KeychainBackend for SecretServiceKeychain {
    fn name(&self) -> &'static str {
        "secret-service"
    }

    fn add_or_update(&self, item: &KeychainItem) -> BackendResult<()> {
        let access_mode = item.access_mode.as_str();
        let migratable = if item.migratable { "true" } else { "false" };

        self.with_collection(|collection| {
            let mut attributes = self.attributes(&item.key);
            attributes.insert("access_mode", access_mode);
            attributes.insert("migratable", migratable);

            // `replace` updates an item with identical attributes in place, so
            // the old secret survives a failed write.
            collection
                .create_item(
                    &self.label(&item.key),
                    attributes,
                    item.secret.as_bytes(),
                    true,
                    "text/plain",
                )
                .map_err(|e| map_error("store", e))?;

            // Copies written under another access mode no longer match and
            // would shadow the new secret.
            let existing = collection
                .search_items(self.attributes(&item.key))
                .map_err(|e| map_error("search", e))?;
            for old in existing {
                let stored = old.get_attributes().map_err(|e| map_error("attributes", e))?;
                if is_stale(&stored, access_mode, migratable) {
                    old.delete().map_err(|e| map_error("delete", e))?;
                }
            }
            Ok(())
        })
    }

    fn fetch(&self, key: &ItemKey) -> BackendResult<Option<String>> {
        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| map_error("search", e))?;

            let Some(item) = items.first() else {
                return Ok(None);
            };

            if item.is_locked().unwrap_or(true) {
                item.unlock().map_err(|e| map_error("unlock item", e))?;
            }

            let secret = item.get_secret().map_err(|e| map_error("read", e))?;
            String::from_utf8(secret).map(Some).map_err(|_| {
                BackendError::with_identifier(
                    BackendErrorCode::InvalidData,
                    "Secret is not valid UTF-8",
                    key.identifier(),
                )
            })
        })
    }

    fn remove(&self, key: &ItemKey) -> BackendResult<()> {
        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| map_error("search", e))?;
            for item in items {
                item.delete().map_err(|e| map_error("delete", e))?;
            }
            Ok(())
        })
    }
}
