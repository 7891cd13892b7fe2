//! CLI command implementations

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use passkeeper_lib::backend::{default_backend, has_native_backend};
use passkeeper_lib::{AccessMode, ManagerConfig, PasswordManager};

pub mod delete;
pub mod get;
pub mod register;
pub mod validate;

/// Global options shared by every command.
pub struct Settings {
    pub service: String,
    pub group: Option<String>,
    pub access_mode: Option<AccessMode>,
    pub no_migrate: bool,
    pub config_path: Option<PathBuf>,
}

/// Resolve configuration: file first, then command-line overrides.
pub fn resolve_config(settings: &Settings) -> Result<ManagerConfig> {
    let mut config = match &settings.config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            ManagerConfig::from_json(&json)
                .with_context(|| format!("failed to load config file {}", path.display()))?
        }
        None => ManagerConfig::default(),
    };

    if let Some(mode) = settings.access_mode {
        config.access_mode = mode;
    }
    if settings.no_migrate {
        config.migrate = false;
    }
    Ok(config)
}

/// Build a manager over the native keychain.
pub fn build_manager(settings: &Settings) -> Result<PasswordManager> {
    let config = resolve_config(settings)?;

    if !has_native_backend() {
        bail!("no supported keychain on this platform");
    }
    let backend = default_backend(&settings.service);
    tracing::debug!(
        backend = backend.name(),
        service = %settings.service,
        ?config,
        "keychain ready"
    );

    Ok(PasswordManager::new(backend, config))
}

/// Human-readable description of an identifier and group.
pub fn describe(identifier: &str, group: Option<&str>) -> String {
    match group.filter(|g| !g.is_empty()) {
        Some(group) => format!("'{identifier}' in group '{group}'"),
        None => format!("'{identifier}'"),
    }
}
