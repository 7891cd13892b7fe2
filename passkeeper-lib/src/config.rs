//! Configuration for keychain writes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Accessibility class applied to items written to the keychain.
///
/// The numeric values match the historical wire values hosts may persist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum AccessMode {
    /// Readable only while the device is unlocked.
    #[default]
    WhenUnlocked = 0,
    /// Readable once the device has been unlocked after boot.
    AfterFirstUnlock = 1,
    /// Readable regardless of lock state.
    Always = 2,
}

impl AccessMode {
    /// All modes, in numeric order.
    pub const ALL: [AccessMode; 3] = [Self::WhenUnlocked, Self::AfterFirstUnlock, Self::Always];

    /// Kebab-case name used by the CLI and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhenUnlocked => "when-unlocked",
            Self::AfterFirstUnlock => "after-first-unlock",
            Self::Always => "always",
        }
    }

    /// Keychain protection class for this mode.
    ///
    /// Non-migratable items use the `ThisDeviceOnly` variant, which keeps
    /// them out of backups restored onto another device.
    pub fn protection_class(&self, migratable: bool) -> &'static str {
        match (self, migratable) {
            (Self::WhenUnlocked, true) => "kSecAttrAccessibleWhenUnlocked",
            (Self::WhenUnlocked, false) => "kSecAttrAccessibleWhenUnlockedThisDeviceOnly",
            (Self::AfterFirstUnlock, true) => "kSecAttrAccessibleAfterFirstUnlock",
            (Self::AfterFirstUnlock, false) => "kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly",
            (Self::Always, true) => "kSecAttrAccessibleAlways",
            (Self::Always, false) => "kSecAttrAccessibleAlwaysThisDeviceOnly",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "when-unlocked" | "0" => Ok(Self::WhenUnlocked),
            "after-first-unlock" | "1" => Ok(Self::AfterFirstUnlock),
            "always" | "2" => Ok(Self::Always),
            other => Err(format!(
                "unknown access mode '{other}' (expected when-unlocked, after-first-unlock or always)"
            )),
        }
    }
}

impl TryFrom<u8> for AccessMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| *mode as u8 == value)
            .ok_or_else(|| format!("unknown access mode value {value}"))
    }
}

/// Manager configuration.
///
/// Applies to add/update calls made after it is set; items already in the
/// keychain keep the attributes they were written with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Allow written items to migrate to a new device through backups.
    #[serde(default = "default_migrate")]
    pub migrate: bool,

    /// Accessibility class for written items.
    #[serde(default)]
    pub access_mode: AccessMode,

    /// Keep a read-through cache of looked-up secrets.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

fn default_migrate() -> bool {
    true
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            migrate: default_migrate(),
            access_mode: AccessMode::default(),
            cache_enabled: default_cache_enabled(),
        }
    }
}

impl ManagerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set whether written items may migrate.
    pub fn with_migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    /// Set the accessibility class for written items.
    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    /// Disable the lookup cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert!(config.migrate);
        assert_eq!(config.access_mode, AccessMode::WhenUnlocked);
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_from_json_partial() {
        let config = ManagerConfig::from_json(r#"{"access_mode": "after-first-unlock"}"#).unwrap();
        assert_eq!(config.access_mode, AccessMode::AfterFirstUnlock);
        assert!(config.migrate);
        assert!(config.cache_enabled);

        let config = ManagerConfig::from_json(r#"{"migrate": false, "cache_enabled": false}"#)
            .unwrap();
        assert!(!config.migrate);
        assert!(!config.cache_enabled);
        assert_eq!(config.access_mode, AccessMode::WhenUnlocked);
    }

    #[test]
    fn test_from_json_rejects_unknown_mode() {
        assert!(ManagerConfig::from_json(r#"{"access_mode": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_access_mode_parse() {
        assert_eq!("always".parse::<AccessMode>(), Ok(AccessMode::Always));
        assert_eq!(
            "AFTER_FIRST_UNLOCK".parse::<AccessMode>(),
            Ok(AccessMode::AfterFirstUnlock)
        );
        assert_eq!("0".parse::<AccessMode>(), Ok(AccessMode::WhenUnlocked));
        assert!("never".parse::<AccessMode>().is_err());

        for mode in AccessMode::ALL {
            assert_eq!(mode.to_string().parse::<AccessMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_access_mode_numeric_values() {
        assert_eq!(AccessMode::WhenUnlocked as u8, 0);
        assert_eq!(AccessMode::AfterFirstUnlock as u8, 1);
        assert_eq!(AccessMode::Always as u8, 2);
        assert_eq!(AccessMode::try_from(2), Ok(AccessMode::Always));
        assert!(AccessMode::try_from(3).is_err());
    }

    #[test]
    fn test_protection_class() {
        assert_eq!(
            AccessMode::WhenUnlocked.protection_class(true),
            "kSecAttrAccessibleWhenUnlocked"
        );
        assert_eq!(
            AccessMode::AfterFirstUnlock.protection_class(false),
            "kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly"
        );
        assert_eq!(
            AccessMode::Always.protection_class(false),
            "kSecAttrAccessibleAlwaysThisDeviceOnly"
        );
    }
}
