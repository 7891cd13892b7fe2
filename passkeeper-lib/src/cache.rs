//! Read-through cache of keychain lookups.
//!
//! The cache only saves round trips to the keychain: a hit returns exactly
//! what the keychain returned when the entry was filled, and any write,
//! delete or purge drops the affected entries. Cached secrets are zeroized
//! when they leave the cache.
//!
//! Every invalidation bumps a generation counter. A reader takes a
//! [`generation`](LookupCache::generation) before going to the keychain and
//! fills the cache with [`insert_if_unchanged`](LookupCache::insert_if_unchanged),
//! which refuses the value if any write or purge happened in between.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use zeroize::Zeroizing;

use crate::item::ItemKey;

/// Lookup cache keyed by `(identifier, group)`.
///
/// A poisoned lock behaves like an empty cache, so callers fall through to
/// the keychain instead of failing.
#[derive(Default)]
pub struct LookupCache {
    entries: RwLock<HashMap<ItemKey, Zeroizing<String>>>,
    /// Only changes while the `entries` write lock is held
    generation: AtomicU64,
}

impl LookupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached secret for `key`. The copy is wiped when the caller drops it.
    pub fn get(&self, key: &ItemKey) -> Option<Zeroizing<String>> {
        let entries = self.entries.read().ok()?;
        entries.get(key).cloned()
    }

    /// Current generation, to be passed back to [`insert_if_unchanged`](Self::insert_if_unchanged).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Remember the secret read for `key` unless the cache was invalidated
    /// since `seen` was taken. Returns whether the value was stored.
    pub fn insert_if_unchanged(&self, key: ItemKey, value: &str, seen: u64) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        if self.generation.load(Ordering::Acquire) != seen {
            return false;
        }
        entries.insert(key, Zeroizing::new(value.to_string()));
        true
    }

    /// Drop the entry for `key`.
    pub fn invalidate(&self, key: &ItemKey) {
        // A stale entry must never survive a write, so recover a poisoned map.
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(key);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
