//! Prelude module for convenient imports.
//!
//! ```rust
//! use passkeeper_lib::prelude::*;
//! ```

// Manager and configuration
pub use crate::config::{AccessMode, ManagerConfig};
pub use crate::manager::PasswordManager;
pub use crate::shared::{drop_shared, shared_instance};

// Error handling
pub use crate::errors::Error;
pub use crate::Result;

// Backends
pub use crate::backend::{default_backend, InMemoryKeychain, KeychainBackend};

// Lifecycle
pub use crate::lifecycle::LifecycleEvent;
