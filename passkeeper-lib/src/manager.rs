//! Password manager facade.
//!
//! [`PasswordManager`] turns register/delete/validate/read requests into
//! calls on a [`KeychainBackend`], consulting the [`LookupCache`] first on
//! reads and invalidating it on writes.

use std::sync::{Arc, RwLock};

use zeroize::Zeroizing;

use crate::backend::{BackendError, BackendResult, KeychainBackend};
use crate::cache::LookupCache;
use crate::config::{AccessMode, ManagerConfig};
use crate::errors::Error;
use crate::item::{ItemKey, KeychainItem};
use crate::lifecycle::LifecycleEvent;
use crate::Result;

/// Stores, validates, reads and deletes secrets keyed by identifier and
/// optional access group.
///
/// Every method that takes a group treats `None` and `Some("")` as the
/// same default group. The ungrouped convenience methods (`register`,
/// `delete`, `valid_key`, `key_for_identifier`) delegate with no group.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use passkeeper_lib::{InMemoryKeychain, ManagerConfig, PasswordManager};
///
/// let manager = PasswordManager::new(Arc::new(InMemoryKeychain::new()), ManagerConfig::default());
///
/// manager.register("s3cr3t", "alice").unwrap();
/// assert_eq!(manager.key_for_identifier("alice").as_deref(), Some("s3cr3t"));
/// assert!(manager.valid_key(None, "alice"));
/// assert!(!manager.valid_key(Some("wrong"), "alice"));
///
/// manager.delete("alice").unwrap();
/// assert_eq!(manager.key_for_identifier("alice"), None);
/// ```
pub struct PasswordManager {
    backend: Arc<dyn KeychainBackend>,
    config: RwLock<ManagerConfig>,
    cache: LookupCache,
}

impl PasswordManager {
    /// Create a manager over `backend` with the given configuration.
    pub fn new(backend: Arc<dyn KeychainBackend>, config: ManagerConfig) -> Self {
        Self {
            backend,
            config: RwLock::new(config),
            cache: LookupCache::new(),
        }
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ManagerConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the configuration for subsequent writes.
    ///
    /// Turning the cache off also purges it.
    pub fn set_config(&self, config: ManagerConfig) {
        self.update_config(|current| *current = config);
    }

    /// Whether items written from now on may migrate to a new device.
    pub fn migrate(&self) -> bool {
        self.config().migrate
    }

    /// Set whether items written from now on may migrate.
    pub fn set_migrate(&self, migrate: bool) {
        self.update_config(|config| config.migrate = migrate);
    }

    /// Accessibility class for items written from now on.
    pub fn access_mode(&self) -> AccessMode {
        self.config().access_mode
    }

    /// Set the accessibility class for items written from now on.
    pub fn set_access_mode(&self, access_mode: AccessMode) {
        self.update_config(|config| config.access_mode = access_mode);
    }

    /// Apply `change` under a single write guard so concurrent setters
    /// don't overwrite each other's fields.
    fn update_config(&self, change: impl FnOnce(&mut ManagerConfig)) {
        let cache_enabled = {
            let mut config = match self.config.write() {
                Ok(config) => config,
                Err(poisoned) => poisoned.into_inner(),
            };
            change(&mut *config);
            config.cache_enabled
        };
        if !cache_enabled {
            self.purge();
        }
    }

    // ------------------------------------------------------------------
    // Keychain access
    // ------------------------------------------------------------------

    /// Add `key` for `identifier` in `group`, or update the existing item.
    ///
    /// The item is written with the current `migrate` and `access_mode`
    /// settings. Ignoring the returned error gives fire-and-forget
    /// semantics; the failure is logged either way.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if `identifier` is empty
    /// - `StorageUnavailable` if the keychain rejected the write
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, key), fields(backend = self.backend.name()))
    )]
    pub fn register_in_group(
        &self,
        key: &str,
        identifier: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let item_key = Self::item_key(identifier, group)?;
        let config = self.config();
        let item = KeychainItem::new(item_key.clone(), key)
            .with_access_mode(config.access_mode)
            .with_migratable(config.migrate);

        let result = self.write_through(&item_key, || self.backend.add_or_update(&item));
        result.map_err(|e| {
            report_failure("register", &item_key, &e);
            Error::storage(identifier, e)
        })
    }

    /// Remove the item for `identifier` in `group`. A missing item is not an error.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if `identifier` is empty
    /// - `StorageUnavailable` if the keychain rejected the delete
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(backend = self.backend.name()))
    )]
    pub fn delete_in_group(&self, identifier: &str, group: Option<&str>) -> Result<()> {
        let item_key = Self::item_key(identifier, group)?;

        match self.write_through(&item_key, || self.backend.remove(&item_key)) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                report_failure("delete", &item_key, &e);
                Err(Error::storage(identifier, e))
            }
        }
    }

    /// Check the stored secret for `identifier` in `group`.
    ///
    /// With `key == None` this only checks that an item exists. Otherwise
    /// it is true iff the stored secret equals `key` exactly. A keychain
    /// failure is logged and reported as `false`.
    pub fn valid_key_in_group(
        &self,
        key: Option<&str>,
        identifier: &str,
        group: Option<&str>,
    ) -> bool {
        self.try_valid_key_in_group(key, identifier, group).unwrap_or(false)
    }

    /// The secret stored for `identifier` in `group`, or `None`.
    ///
    /// A keychain failure is logged and reported as `None`; use
    /// [`try_key_for_identifier_in_group`](Self::try_key_for_identifier_in_group)
    /// to tell the two apart.
    ///
    /// The returned `String` belongs to the caller and is not wiped by
    /// [`purge`](Self::purge); wrap it in `zeroize::Zeroizing` to clear it on drop.
    pub fn key_for_identifier_in_group(
        &self,
        identifier: &str,
        group: Option<&str>,
    ) -> Option<String> {
        self.try_key_for_identifier_in_group(identifier, group).unwrap_or(None)
    }

    /// Like [`valid_key_in_group`](Self::valid_key_in_group) but surfaces
    /// keychain failures.
    pub fn try_valid_key_in_group(
        &self,
        key: Option<&str>,
        identifier: &str,
        group: Option<&str>,
    ) -> Result<bool> {
        let stored = self.cached_or_fetched(identifier, group)?;
        Ok(match (stored, key) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(stored), Some(key)) => stored.as_bytes() == key.as_bytes(),
        })
    }

    /// Like [`key_for_identifier_in_group`](Self::key_for_identifier_in_group)
    /// but surfaces keychain failures.
    ///
    /// An empty identifier never names an item and yields `Ok(None)`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(backend = self.backend.name()))
    )]
    pub fn try_key_for_identifier_in_group(
        &self,
        identifier: &str,
        group: Option<&str>,
    ) -> Result<Option<String>> {
        let stored = self.cached_or_fetched(identifier, group)?;
        Ok(stored.map(|secret| secret.as_str().to_owned()))
    }

    // ------------------------------------------------------------------
    // Ungrouped convenience methods
    // ------------------------------------------------------------------

    /// [`register_in_group`](Self::register_in_group) with no group.
    pub fn register(&self, key: &str, identifier: &str) -> Result<()> {
        self.register_in_group(key, identifier, None)
    }

    /// [`delete_in_group`](Self::delete_in_group) with no group.
    pub fn delete(&self, identifier: &str) -> Result<()> {
        self.delete_in_group(identifier, None)
    }

    /// [`valid_key_in_group`](Self::valid_key_in_group) with no group.
    pub fn valid_key(&self, key: Option<&str>, identifier: &str) -> bool {
        self.valid_key_in_group(key, identifier, None)
    }

    /// [`key_for_identifier_in_group`](Self::key_for_identifier_in_group) with no group.
    pub fn key_for_identifier(&self, identifier: &str) -> Option<String> {
        self.key_for_identifier_in_group(identifier, None)
    }

    /// [`try_valid_key_in_group`](Self::try_valid_key_in_group) with no group.
    pub fn try_valid_key(&self, key: Option<&str>, identifier: &str) -> Result<bool> {
        self.try_valid_key_in_group(key, identifier, None)
    }

    /// [`try_key_for_identifier_in_group`](Self::try_key_for_identifier_in_group) with no group.
    pub fn try_key_for_identifier(&self, identifier: &str) -> Result<Option<String>> {
        self.try_key_for_identifier_in_group(identifier, None)
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    /// Remove every cached secret from memory. Stored items are untouched.
    pub fn purge(&self) {
        self.cache.clear();
        #[cfg(feature = "tracing")]
        tracing::debug!(backend = self.backend.name(), "lookup cache purged");
    }

    /// React to a host lifecycle event; backgrounding and locking purge the cache.
    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        if event.should_purge() {
            self.purge();
        }
    }

    /// Number of secrets currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Run a backend write with the cache entry for `key` invalidated on
    /// both sides. The second invalidation also turns away readers that
    /// fetched the old value while the write was in flight.
    fn write_through<T>(
        &self,
        key: &ItemKey,
        write: impl FnOnce() -> BackendResult<T>,
    ) -> BackendResult<T> {
        self.cache.invalidate(key);
        let result = write();
        self.cache.invalidate(key);
        result
    }

    /// Cache lookup falling back to the backend. Secrets stay in
    /// `Zeroizing` until they are handed to the caller.
    fn cached_or_fetched(
        &self,
        identifier: &str,
        group: Option<&str>,
    ) -> Result<Option<Zeroizing<String>>> {
        if identifier.is_empty() {
            return Ok(None);
        }
        let item_key = ItemKey::new(identifier, group);
        let cache_enabled = self.config().cache_enabled;

        if cache_enabled {
            if let Some(hit) = self.cache.get(&item_key) {
                return Ok(Some(hit));
            }
        }

        let generation = self.cache.generation();
        match self.backend.fetch(&item_key) {
            Ok(Some(secret)) => {
                let secret = Zeroizing::new(secret);
                if cache_enabled {
                    self.cache.insert_if_unchanged(item_key, &secret, generation);
                }
                Ok(Some(secret))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                report_failure("read", &item_key, &e);
                Err(Error::storage(identifier, e))
            }
        }
    }

    fn item_key(identifier: &str, group: Option<&str>) -> Result<ItemKey> {
        if identifier.is_empty() {
            return Err(Error::InvalidIdentifier);
        }
        Ok(ItemKey::new(identifier, group))
    }
}

impl std::fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordManager")
            .field("backend", &self.backend.name())
            .field("config", &self.config())
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn report_failure(operation: &str, key: &ItemKey, err: &BackendError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(operation, item = %key, code = ?err.code, "keychain request failed: {err}");
    #[cfg(not(feature = "tracing"))]
    eprintln!("keychain {operation} for '{key}' failed: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendErrorCode, InMemoryKeychain};
    use std::sync::{Mutex, Weak};

    /// Reads through the manager from inside every write, like a second
    /// caller landing between cache invalidation and the keychain update.
    #[derive(Default)]
    struct ReadDuringWriteKeychain {
        inner: InMemoryKeychain,
        reader: Mutex<Weak<PasswordManager>>,
    }

    impl ReadDuringWriteKeychain {
        fn read_through_manager(&self, key: &ItemKey) {
            let manager = self.reader.lock().unwrap().upgrade();
            if let Some(manager) = manager {
                manager.key_for_identifier_in_group(key.identifier(), key.group());
            }
        }
    }

    impl KeychainBackend for ReadDuringWriteKeychain {
        fn name(&self) -> &'static str {
            "read-during-write"
        }

        fn add_or_update(&self, item: &KeychainItem) -> BackendResult<()> {
            self.read_through_manager(&item.key);
            self.inner.add_or_update(item)
        }

        fn fetch(&self, key: &ItemKey) -> BackendResult<Option<String>> {
            self.inner.fetch(key)
        }

        fn remove(&self, key: &ItemKey) -> BackendResult<()> {
            self.read_through_manager(key);
            self.inner.remove(key)
        }
    }

    fn read_during_write_manager() -> (Arc<ReadDuringWriteKeychain>, Arc<PasswordManager>) {
        let keychain = Arc::new(ReadDuringWriteKeychain::default());
        let manager = Arc::new(PasswordManager::new(keychain.clone(), ManagerConfig::default()));
        *keychain.reader.lock().unwrap() = Arc::downgrade(&manager);
        (keychain, manager)
    }

    fn manager_with(config: ManagerConfig) -> (Arc<InMemoryKeychain>, PasswordManager) {
        let keychain = Arc::new(InMemoryKeychain::new());
        let manager = PasswordManager::new(keychain.clone(), config);
        (keychain, manager)
    }

    fn manager() -> (Arc<InMemoryKeychain>, PasswordManager) {
        manager_with(ManagerConfig::default())
    }

    #[test]
    fn test_register_and_read() {
        let (_, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        assert_eq!(manager.key_for_identifier("alice"), Some("s3cr3t".to_string()));
    }

    #[test]
    fn test_read_missing() {
        let (_, manager) = manager();
        assert_eq!(manager.key_for_identifier("nobody"), None);
        assert!(!manager.valid_key(None, "nobody"));
        assert!(!manager.valid_key(Some("anything"), "nobody"));
    }

    #[test]
    fn test_valid_key_exact_match() {
        let (_, manager) = manager();
        manager.register("Secret", "alice").unwrap();

        assert!(manager.valid_key(Some("Secret"), "alice"));
        assert!(!manager.valid_key(Some("secret"), "alice"));
        assert!(!manager.valid_key(Some("Secret "), "alice"));
        assert!(!manager.valid_key(Some(""), "alice"));
        assert!(manager.valid_key(None, "alice"));
    }

    #[test]
    fn test_second_read_is_served_from_cache() {
        let (keychain, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();

        manager.key_for_identifier("alice");
        manager.key_for_identifier("alice");
        manager.valid_key(Some("s3cr3t"), "alice");

        assert_eq!(keychain.fetch_count(), 1);
        assert_eq!(manager.cached_len(), 1);
    }

    #[test]
    fn test_misses_are_not_cached() {
        let (keychain, manager) = manager();
        manager.key_for_identifier("alice");
        manager.key_for_identifier("alice");

        assert_eq!(keychain.fetch_count(), 2);
        assert_eq!(manager.cached_len(), 0);
    }

    #[test]
    fn test_register_refreshes_cached_value() {
        let (_, manager) = manager();
        manager.register("first", "alice").unwrap();
        assert_eq!(manager.key_for_identifier("alice"), Some("first".to_string()));

        manager.register("second", "alice").unwrap();
        assert_eq!(manager.key_for_identifier("alice"), Some("second".to_string()));
    }

    #[test]
    fn test_delete_invalidates_cache() {
        let (_, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");

        manager.delete("alice").unwrap();

        assert_eq!(manager.cached_len(), 0);
        assert_eq!(manager.key_for_identifier("alice"), None);
        assert!(!manager.valid_key(None, "alice"));
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let (_, manager) = manager();
        manager.delete("nobody").unwrap();
        manager.delete_in_group("nobody", Some("team")).unwrap();
    }

    #[test]
    fn test_purge_keeps_stored_items() {
        let (keychain, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");

        manager.purge();

        assert_eq!(manager.cached_len(), 0);
        assert_eq!(keychain.len(), 1);
        assert_eq!(manager.key_for_identifier("alice"), Some("s3cr3t".to_string()));
        assert_eq!(keychain.fetch_count(), 2);
    }

    #[test]
    fn test_lifecycle_events() {
        let (_, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");

        manager.handle_lifecycle_event(LifecycleEvent::WillEnterForeground);
        assert_eq!(manager.cached_len(), 1);

        manager.handle_lifecycle_event(LifecycleEvent::DeviceLocked);
        assert_eq!(manager.cached_len(), 0);

        manager.key_for_identifier("alice");
        manager.handle_lifecycle_event(LifecycleEvent::DidEnterBackground);
        assert_eq!(manager.cached_len(), 0);
    }

    #[test]
    fn test_group_isolation() {
        let (_, manager) = manager();
        manager.register_in_group("a", "id1", Some("g1")).unwrap();

        assert_eq!(manager.key_for_identifier_in_group("id1", Some("g2")), None);
        assert_eq!(manager.key_for_identifier("id1"), None);
        assert_eq!(
            manager.key_for_identifier_in_group("id1", Some("g1")),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_empty_group_is_default_group() {
        let (_, manager) = manager();
        manager.register_in_group("pw", "alice", Some("")).unwrap();
        assert_eq!(manager.key_for_identifier("alice"), Some("pw".to_string()));
    }

    #[test]
    fn test_config_applies_to_later_writes_only() {
        let (keychain, manager) = manager();
        manager.register("one", "first").unwrap();

        manager.set_migrate(false);
        manager.set_access_mode(AccessMode::AfterFirstUnlock);
        manager.register("two", "second").unwrap();

        let first = keychain.stored_attributes(&ItemKey::ungrouped("first")).unwrap();
        assert!(first.migratable);
        assert_eq!(first.access_mode, AccessMode::WhenUnlocked);

        let second = keychain.stored_attributes(&ItemKey::ungrouped("second")).unwrap();
        assert!(!second.migratable);
        assert_eq!(second.access_mode, AccessMode::AfterFirstUnlock);
    }

    #[test]
    fn test_disabled_cache_reads_through() {
        let (keychain, manager) = manager_with(ManagerConfig::default().without_cache());
        manager.register("s3cr3t", "alice").unwrap();

        assert_eq!(manager.key_for_identifier("alice"), Some("s3cr3t".to_string()));
        assert_eq!(manager.key_for_identifier("alice"), Some("s3cr3t".to_string()));
        assert_eq!(keychain.fetch_count(), 2);
        assert_eq!(manager.cached_len(), 0);
    }

    #[test]
    fn test_disabling_cache_purges() {
        let (_, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");

        manager.set_config(manager.config().without_cache());
        assert_eq!(manager.cached_len(), 0);
    }

    #[test]
    fn test_register_failure_is_surfaced() {
        let (keychain, manager) = manager();
        keychain.set_available(false);

        let err = manager.register("s3cr3t", "alice").unwrap_err();
        match err {
            Error::StorageUnavailable { identifier, source } => {
                assert_eq!(identifier, "alice");
                assert_eq!(source.code, BackendErrorCode::Unavailable);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_register_does_not_leave_stale_cache() {
        let (keychain, manager) = manager();
        manager.register("old", "alice").unwrap();
        manager.key_for_identifier("alice");

        keychain.set_available(false);
        assert!(manager.register("new", "alice").is_err());
        keychain.set_available(true);

        assert_eq!(manager.key_for_identifier("alice"), Some("old".to_string()));
        assert_eq!(keychain.fetch_count(), 2);
    }

    #[test]
    fn test_read_failure_strict_and_lenient() {
        let (keychain, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        keychain.set_available(false);

        assert!(manager.try_key_for_identifier("alice").is_err());
        assert!(manager.try_valid_key(None, "alice").is_err());
        assert_eq!(manager.key_for_identifier("alice"), None);
        assert!(!manager.valid_key(None, "alice"));
    }

    #[test]
    fn test_empty_identifier() {
        let (keychain, manager) = manager();
        assert!(matches!(
            manager.register("pw", ""),
            Err(Error::InvalidIdentifier)
        ));
        assert!(matches!(manager.delete(""), Err(Error::InvalidIdentifier)));
        assert_eq!(manager.key_for_identifier(""), None);
        assert!(!manager.valid_key(None, ""));
        assert!(keychain.is_empty());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let (_, manager) = manager();
        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");

        let debug = format!("{:?}", manager);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("in-memory"));
    }

    #[test]
    fn test_read_during_update_does_not_cache_old_secret() {
        let (keychain, manager) = read_during_write_manager();

        manager.register("old", "alice").unwrap();
        manager.register("new", "alice").unwrap();

        let stored = keychain.inner.fetch(&ItemKey::ungrouped("alice")).unwrap();
        assert_eq!(stored.as_deref(), Some("new"));
        assert_eq!(manager.key_for_identifier("alice").as_deref(), Some("new"));
        assert!(manager.valid_key(Some("new"), "alice"));
    }

    #[test]
    fn test_read_during_delete_does_not_cache_removed_secret() {
        let (_, manager) = read_during_write_manager();

        manager.register("s3cr3t", "alice").unwrap();
        manager.key_for_identifier("alice");
        manager.delete("alice").unwrap();

        assert_eq!(manager.cached_len(), 0);
        assert_eq!(manager.key_for_identifier("alice"), None);
        assert!(!manager.valid_key(None, "alice"));
    }

    #[test]
    fn test_concurrent_setters_keep_both_changes() {
        for _ in 0..100 {
            let (_, manager) = manager();
            std::thread::scope(|s| {
                s.spawn(|| manager.set_migrate(false));
                s.spawn(|| manager.set_access_mode(AccessMode::Always));
            });
            assert!(!manager.migrate());
            assert_eq!(manager.access_mode(), AccessMode::Always);
        }
    }
}
