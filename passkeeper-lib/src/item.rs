//! Keychain item addressing.

use std::fmt;

use zeroize::Zeroize;

use crate::config::AccessMode;

/// The `(identifier, group)` pair that addresses one keychain item.
///
/// An empty group is the same item as no group at all.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemKey {
    identifier: String,
    group: Option<String>,
}

impl ItemKey {
    /// Build a key, normalising an empty group to `None`.
    pub fn new(identifier: impl Into<String>, group: Option<&str>) -> Self {
        Self {
            identifier: identifier.into(),
            group: group.filter(|g| !g.is_empty()).map(str::to_string),
        }
    }

    /// Key in the default (no) group.
    pub fn ungrouped(identifier: impl Into<String>) -> Self {
        Self::new(identifier, None)
    }

    /// The application-chosen identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The access group, if any.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}@{}", self.identifier, group),
            None => f.write_str(&self.identifier),
        }
    }
}

/// A secret together with the attributes it is written with.
#[derive(Clone)]
pub struct KeychainItem {
    /// Where the item lives
    pub key: ItemKey,
    /// The secret value
    pub secret: String,
    /// Accessibility class
    pub access_mode: AccessMode,
    /// Whether the item may be restored onto another device
    pub migratable: bool,
}

impl KeychainItem {
    /// Create an item with default attributes.
    pub fn new(key: ItemKey, secret: impl Into<String>) -> Self {
        Self {
            key,
            secret: secret.into(),
            access_mode: AccessMode::default(),
            migratable: true,
        }
    }

    /// Set the accessibility class.
    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    /// Set whether the item may migrate.
    pub fn with_migratable(mut self, migratable: bool) -> Self {
        self.migratable = migratable;
        self
    }

    /// Protection class name for this item's attributes.
    pub fn protection_class(&self) -> &'static str {
        self.access_mode.protection_class(self.migratable)
    }
}

// Secrets stay out of debug output.
impl fmt::Debug for KeychainItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeychainItem")
            .field("key", &self.key)
            .field("secret_len", &self.secret.len())
            .field("access_mode", &self.access_mode)
            .field("migratable", &self.migratable)
            .finish()
    }
}

impl Drop for KeychainItem {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
