//! Delete command - remove a stored secret

use anyhow::Result;
use passkeeper_lib::PasswordManager;

use crate::ui;

pub fn run(manager: &PasswordManager, identifier: &str, group: Option<&str>) -> Result<bool> {
    let target = super::describe(identifier, group);
    if !manager.try_valid_key_in_group(None, identifier, group)? {
        ui::info(&format!("Nothing stored for {target}"));
        return Ok(true);
    }
    manager.delete_in_group(identifier, group)?;
    ui::success(&format!("Removed {target}"));
    Ok(true)
}
