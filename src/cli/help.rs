//! Command-name contract used in logs.

use crate::cli::parse::{AutoloadCommands, CatalogCommands, Commands};

/// Dotted command name (e.g. "check", "autoload.write").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Check { .. } => "check".to_string(),
        Commands::Adjust { .. } => "adjust".to_string(),
        Commands::Status { .. } => "status".to_string(),
        Commands::List { .. } => "list".to_string(),
        Commands::Forget { .. } => "forget".to_string(),
        Commands::Diff { .. } => "diff".to_string(),
        Commands::Autoload { command } => format!("autoload.{}", autoload_command_name(command)),
        Commands::Daemon { .. } => "daemon".to_string(),
        Commands::Catalog { command } => format!("catalog.{}", catalog_command_name(command)),
    }
}

pub fn autoload_command_name(command: &AutoloadCommands) -> &'static str {
    match command {
        AutoloadCommands::Read => "read",
        AutoloadCommands::Write { .. } => "write",
    }
}

pub fn catalog_command_name(command: &CatalogCommands) -> &'static str {
    match command {
        CatalogCommands::Tree => "tree",
    }
}
