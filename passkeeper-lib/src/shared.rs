//! Process-wide shared manager.
//!
//! An opt-in convenience for hosts that want one manager for the whole
//! process. Code that can pass a [`PasswordManager`] around explicitly
//! should do that instead.

use std::sync::{Arc, RwLock};

use crate::backend::default_backend;
use crate::config::ManagerConfig;
use crate::manager::PasswordManager;

/// Service name the shared manager uses for its platform backend.
pub const DEFAULT_SERVICE: &str = "com.passkeeper.shared";

static SHARED: RwLock<Option<Arc<PasswordManager>>> = RwLock::new(None);

/// The shared manager, created on first access.
///
/// A newly created instance uses the platform backend from
/// [`default_backend`] and the default configuration (`migrate = true`,
/// `access_mode = WhenUnlocked`).
pub fn shared_instance() -> Arc<PasswordManager> {
    if let Some(existing) = SHARED.read().ok().and_then(|slot| slot.clone()) {
        return existing;
    }

    let mut slot = match SHARED.write() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    // Another caller may have created it between the two locks.
    slot.get_or_insert_with(|| {
        #[cfg(feature = "tracing")]
        tracing::debug!("creating shared password manager");
        Arc::new(PasswordManager::new(
            default_backend(DEFAULT_SERVICE),
            ManagerConfig::default(),
        ))
    })
    .clone()
}

/// Release the shared manager and its cache.
///
/// Callers still holding an `Arc` keep a working manager; the next
/// [`shared_instance`] call creates a fresh one with default configuration.
pub fn drop_shared() {
    let previous = match SHARED.write() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(manager) = previous {
        manager.purge();
    }
}

/// Make `manager` the shared instance, replacing (and purging) any previous one.
pub fn install_shared(manager: Arc<PasswordManager>) {
    let previous = match SHARED.write() {
        Ok(mut slot) => slot.replace(manager),
        Err(poisoned) => poisoned.into_inner().replace(manager),
    };
    if let Some(previous) = previous {
        previous.purge();
    }
}
