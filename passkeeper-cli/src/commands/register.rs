//! Register command - add or update a secret

use anyhow::{bail, Result};
use passkeeper_lib::PasswordManager;

use crate::ui;

pub fn run(
    manager: &PasswordManager,
    identifier: &str,
    key: Option<String>,
    group: Option<&str>,
    verbose: bool,
) -> Result<bool> {
    let key = match key {
        Some(key) => key,
        None => {
            let first = ui::secret("Secret")?;
            let second = ui::secret("Repeat secret")?;
            if first != second {
                bail!("secrets do not match");
            }
            first
        }
    };

    manager.register_in_group(&key, identifier, group)?;
    ui::success(&format!("Stored secret for {}", super::describe(identifier, group)));

    if verbose {
        let config = manager.config();
        ui::key_value("Backend", manager.backend_name());
        ui::key_value("Access mode", config.access_mode.as_str());
        ui::key_value("Migratable", if config.migrate { "yes" } else { "no" });
    }
    Ok(true)
}
