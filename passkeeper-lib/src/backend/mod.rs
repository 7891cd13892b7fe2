//! Keychain backends.
//!
//! The platform secure-storage service sits behind [`KeychainBackend`], with
//! implementations for:
//! - In-memory storage (for testing)
//! - Apple Keychain Services (macOS, iOS)
//! - Linux Secret Service
//!
//! ## Usage
//!
//! ```rust
//! use passkeeper_lib::backend::{InMemoryKeychain, KeychainBackend};
//! use passkeeper_lib::{ItemKey, KeychainItem};
//!
//! let keychain = InMemoryKeychain::new();
//! let key = ItemKey::new("alice", None);
//!
//! keychain.add_or_update(&KeychainItem::new(key.clone(), "s3cr3t")).unwrap();
//! assert_eq!(keychain.fetch(&key).unwrap().as_deref(), Some("s3cr3t"));
//! ```

use std::sync::Arc;

mod memory;
mod traits;

#[cfg(target_vendor = "apple")]
mod apple;

#[cfg(target_os = "linux")]
mod secret_service;

pub use memory::{InMemoryKeychain, StoredAttributes};
pub use traits::{BackendError, BackendErrorCode, BackendResult, KeychainBackend};

#[cfg(target_vendor = "apple")]
pub use apple::AppleKeychain;

#[cfg(target_os = "linux")]
pub use secret_service::SecretServiceKeychain;

/// The native backend for this platform.
///
/// Falls back to [`InMemoryKeychain`] on platforms without a supported
/// keychain; secrets then do not outlive the process.
pub fn default_backend(service: &str) -> Arc<dyn KeychainBackend> {
    #[cfg(target_vendor = "apple")]
    {
        Arc::new(AppleKeychain::new(service))
    }

    #[cfg(target_os = "linux")]
    {
        Arc::new(SecretServiceKeychain::new(service))
    }

    #[cfg(not(any(target_vendor = "apple", target_os = "linux")))]
    {
        let _ = service;
        Arc::new(InMemoryKeychain::new())
    }
}

/// Whether [`default_backend`] persists secrets beyond the process.
pub fn has_native_backend() -> bool {
    cfg!(any(target_vendor = "apple", target_os = "linux"))
}
