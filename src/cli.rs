//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{AutoloadCommands, CatalogCommands, Cli, Commands, DiffTarget};
pub use presentation::{
    format_catalog_tree, format_pass_outcome, format_status, format_tracked_list, state_label,
};
pub use route::RunContext;
