//! Passkeeper CLI
//!
//! Command-line interface over the platform keychain.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use passkeeper_lib::AccessMode;

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "passkeeper")]
#[command(about = "Store, check and remove secrets in the platform keychain", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keychain access group shared with other applications
    #[arg(short, long, global = true)]
    group: Option<String>,

    /// Service name items are stored under
    #[arg(long, global = true, env = "PASSKEEPER_SERVICE", default_value = "com.passkeeper.cli")]
    service: String,

    /// Accessibility of written items (when-unlocked, after-first-unlock, always)
    #[arg(long, global = true)]
    access_mode: Option<AccessMode>,

    /// Keep written items on this device when restoring backups elsewhere
    #[arg(long, global = true)]
    no_migrate: bool,

    /// JSON configuration file (migrate, access_mode, cache_enabled)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or update the secret for an identifier
    Register {
        /// Identifier the secret is stored under (e.g. a user name)
        identifier: String,

        /// Secret to store; prompted for with hidden input when omitted.
        /// A value given here is visible in the process list and shell history.
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Print the secret stored for an identifier
    Get {
        /// Identifier to look up
        identifier: String,
    },

    /// Check that an identifier exists, or that its secret matches
    Validate {
        /// Identifier to look up
        identifier: String,

        /// Secret to compare against; only presence is checked when omitted.
        /// A value given here is visible in the process list and shell history.
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Remove the secret for an identifier
    Delete {
        /// Identifier to remove
        identifier: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("passkeeper=debug,passkeeper_lib=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("passkeeper=info,passkeeper_lib=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let settings = commands::Settings {
        service: cli.service,
        group: cli.group,
        access_mode: cli.access_mode,
        no_migrate: cli.no_migrate,
        config_path: cli.config,
    };
    let manager = commands::build_manager(&settings)?;
    let group = settings.group.as_deref();

    // Dispatch commands
    let ok = match cli.command {
        Commands::Register { identifier, key } => {
            commands::register::run(&manager, &identifier, key, group, cli.verbose)?
        }
        Commands::Get { identifier } => commands::get::run(&manager, &identifier, group)?,
        Commands::Validate { identifier, key } => {
            commands::validate::run(&manager, &identifier, key.as_deref(), group)?
        }
        Commands::Delete { identifier } => commands::delete::run(&manager, &identifier, group)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
