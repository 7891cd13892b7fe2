//! Apple Keychain Services backend (macOS and iOS).
//!
//! Items are generic passwords: the service is the application's service
//! name, the account is the identifier and the group, when present, is the
//! keychain access group. The group must be listed in the application's
//! `keychain-access-groups` entitlement and start with its bundle seed ID.

use security_framework::access_control::{ProtectionMode, SecAccessControl};
use security_framework::base::Error as SecError;
use security_framework::passwords::{
    delete_generic_password_options, generic_password, set_generic_password_options,
    PasswordOptions,
};

use zeroize::Zeroizing;

use super::traits::{BackendError, BackendErrorCode, BackendResult, KeychainBackend};
use crate::config::AccessMode;
use crate::item::{ItemKey, KeychainItem};

/// errSecItemNotFound
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
/// errSecInteractionNotAllowed, returned while the device is locked
const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;
/// errSecMissingEntitlement, returned for an access group the app may not use
const ERR_SEC_MISSING_ENTITLEMENT: i32 = -34018;

/// Keychain Services backed storage.
pub struct AppleKeychain {
    /// Service attribute shared by every item this backend writes
    service: String,
}

impl AppleKeychain {
    /// Create a backend writing items under the given service name.
    ///
    /// The service name should be your app's bundle identifier or a unique
    /// string to namespace its items.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Get the service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn options(&self, key: &ItemKey) -> PasswordOptions {
        let mut options = PasswordOptions::new_generic_password(&self.service, key.identifier());
        if let Some(group) = key.group() {
            options.set_access_group(group);
        }
        options
    }

    fn protection_mode(access_mode: AccessMode, migratable: bool) -> ProtectionMode {
        match (access_mode, migratable) {
            (AccessMode::WhenUnlocked, true) => ProtectionMode::AccessibleWhenUnlocked,
            (AccessMode::WhenUnlocked, false) => {
                ProtectionMode::AccessibleWhenUnlockedThisDeviceOnly
            }
            (AccessMode::AfterFirstUnlock, true) => ProtectionMode::AccessibleAfterFirstUnlock,
            (AccessMode::AfterFirstUnlock, false) => {
                ProtectionMode::AccessibleAfterFirstUnlockThisDeviceOnly
            }
            #[allow(deprecated)]
            (AccessMode::Always, true) => ProtectionMode::AccessibleAlways,
            #[allow(deprecated)]
            (AccessMode::Always, false) => ProtectionMode::AccessibleAlwaysThisDeviceOnly,
        }
    }

    fn add(&self, item: &KeychainItem) -> BackendResult<()> {
        let access_control = SecAccessControl::create_with_protection(
            Some(Self::protection_mode(item.access_mode, item.migratable)),
            0,
        )
        .map_err(|e| Self::map_error(&item.key, "access control", e))?;

        let mut options = self.options(&item.key);
        options.set_access_control(access_control);

        set_generic_password_options(item.secret.as_bytes(), options)
            .map_err(|e| Self::map_error(&item.key, "store", e))
    }

    /// Put back a secret whose replacement could not be written. The
    /// restored item gets the default protection class.
    fn restore(&self, key: &ItemKey, secret: &str) {
        if let Err(err) = set_generic_password_options(secret.as_bytes(), self.options(key)) {
            #[cfg(feature = "tracing")]
            tracing::error!(item = %key, "failed to restore previous keychain item: {err}");
            #[cfg(not(feature = "tracing"))]
            eprintln!("failed to restore previous keychain item '{key}': {err}");
        }
    }

    fn map_error(key: &ItemKey, operation: &str, err: SecError) -> BackendError {
        let code = match err.code() {
            ERR_SEC_ITEM_NOT_FOUND => BackendErrorCode::NotFound,
            ERR_SEC_INTERACTION_NOT_ALLOWED => BackendErrorCode::Locked,
            ERR_SEC_MISSING_ENTITLEMENT => BackendErrorCode::AccessDenied,
            _ => BackendErrorCode::Unavailable,
        };
        BackendError::with_identifier(
            code,
            format!("Keychain {} failed: {}", operation, err),
            key.identifier(),
        )
    }
}

/// Replace an item whose protection class may change.
///
/// Keychain Services fixes accessibility when an item is created, so an
/// update removes the old item and adds a new one. The previous secret is
/// read first and written back if the add fails.
fn replace_keeping_previous(
    fetch: impl FnOnce() -> BackendResult<Option<String>>,
    remove: impl FnOnce() -> BackendResult<()>,
    add: impl FnOnce() -> BackendResult<()>,
    restore: impl FnOnce(&str),
) -> BackendResult<()> {
    let previous = fetch()?.map(Zeroizing::new);
    if previous.is_some() {
        remove()?;
    }

    let result = add();
    if let (Err(_), Some(previous)) = (&result, &previous) {
        restore(previous.as_str());
    }
    result
}

impl KeychainBackend for AppleKeychain {
    fn name(&self) -> &'static str {
        "apple-keychain"
    }

    fn add_or_update(&self, item: &KeychainItem) -> BackendResult<()> {
        replace_keeping_previous(
            || self.fetch(&item.key),
            || self.remove(&item.key),
            || self.add(item),
            |previous| self.restore(&item.key, previous),
        )
    }

    fn fetch(&self, key: &ItemKey) -> BackendResult<Option<String>> {
        match generic_password(self.options(key)) {
            Ok(bytes) => String::from_utf8(bytes).map(Some).map_err(|_| {
                BackendError::with_identifier(
                    BackendErrorCode::InvalidData,
                    "Keychain item is not valid UTF-8",
                    key.identifier(),
                )
            }),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(Self::map_error(key, "fetch", e)),
        }
    }

    fn remove(&self, key: &ItemKey) -> BackendResult<()> {
        match delete_generic_password_options(self.options(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(()),
            Err(e) => Err(Self::map_error(key, "delete", e)),
        }
    }
}
