//! Validate command - check presence or value of a secret

use anyhow::Result;
use passkeeper_lib::PasswordManager;

use crate::ui;

pub fn run(
    manager: &PasswordManager,
    identifier: &str,
    key: Option<&str>,
    group: Option<&str>,
) -> Result<bool> {
    let target = super::describe(identifier, group);
    let valid = manager.try_valid_key_in_group(key, identifier, group)?;

    match (valid, key) {
        (true, Some(_)) => ui::success(&format!("Secret matches for {target}")),
        (true, None) => ui::success(&format!("A secret is stored for {target}")),
        (false, Some(_)) => ui::error(&format!("Secret does not match for {target}")),
        (false, None) => ui::error(&format!("No secret stored for {target}")),
    }
    Ok(valid)
}
