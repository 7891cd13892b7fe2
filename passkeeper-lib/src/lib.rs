//! Passkeeper library.
//!
//! A small password manager over the platform keychain. Secrets (passwords,
//! or preferably password hashes) are stored under an application-chosen
//! identifier, optionally inside a keychain access group shared between
//! cooperating applications.
//!
//! # Features
//!
//! - **Keychain backends**: Apple Keychain Services, Linux Secret Service,
//!   and an in-memory keychain for tests
//! - **Lookup cache**: repeated reads skip the keychain until the next
//!   write, delete, purge, backgrounding or device lock
//! - **Write attributes**: accessibility class and device migration, applied
//!   to subsequent writes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use passkeeper_lib::{AccessMode, InMemoryKeychain, ManagerConfig, PasswordManager};
//!
//! let config = ManagerConfig::default().with_access_mode(AccessMode::AfterFirstUnlock);
//! let manager = PasswordManager::new(Arc::new(InMemoryKeychain::new()), config);
//!
//! manager.register_in_group("hash", "alice", Some("ABCDE12345.shared")).unwrap();
//! assert!(manager.valid_key_in_group(Some("hash"), "alice", Some("ABCDE12345.shared")));
//! assert_eq!(manager.key_for_identifier("alice"), None);
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod errors;
pub mod item;
pub mod lifecycle;
pub mod manager;
pub mod prelude;
pub mod shared;

pub use backend::{
    default_backend, BackendError, BackendErrorCode, InMemoryKeychain, KeychainBackend,
};
pub use config::{AccessMode, ManagerConfig};
pub use errors::Error;
pub use item::{ItemKey, KeychainItem};
pub use lifecycle::LifecycleEvent;
pub use manager::PasswordManager;
pub use shared::{drop_shared, install_shared, shared_instance};

/// Common result alias for password manager operations.
pub type Result<T> = std::result::Result<T, Error>;
