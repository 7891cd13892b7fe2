//! Get command - print a stored secret

use anyhow::Result;
use passkeeper_lib::PasswordManager;

use crate::ui;

pub fn run(manager: &PasswordManager, identifier: &str, group: Option<&str>) -> Result<bool> {
    match manager.try_key_for_identifier_in_group(identifier, group)? {
        Some(secret) => {
            println!("{secret}");
            Ok(true)
        }
        None => {
            ui::error(&format!("No secret stored for {}", super::describe(identifier, group)));
            Ok(false)
        }
    }
}
